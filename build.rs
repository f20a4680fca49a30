fn main() {
    // Host builds (--no-default-features) have no ESP-IDF toolchain to forward.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
