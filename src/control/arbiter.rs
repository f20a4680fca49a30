//! Output arbiter: save/restore bookkeeping for shared output relays.
//!
//! Stateless functions over the device model.  `save` copies `statePin` into
//! `lastState`; `restore` copies it back unless the relay is under manual
//! control.  There is one `lastState` slot per relay and no stack: the last
//! source to save wins, so every source must pair its own save and restore.
//!
//! These are the only functions in the crate that write `last_state`.

use crate::error::{ConfigurationError, Result, StateConflict};
use crate::model::{Device, OutPower, Relay, RelayId};

fn output_mut(device: &mut Device, id: RelayId) -> Result<&mut Relay> {
    let relay = device
        .relay_mut(id)
        .ok_or(ConfigurationError::RelayNotFound(id))?;
    if !relay.is_output {
        return Err(ConfigurationError::RelayNotOutput(id).into());
    }
    Ok(relay)
}

/// Record the relay's current target for a later [`restore`].
pub fn save(device: &mut Device, id: RelayId) -> Result<()> {
    let relay = output_mut(device, id)?;
    relay.last_state = relay.state_pin;
    Ok(())
}

/// Put back the value recorded by [`save`].
pub fn restore(device: &mut Device, id: RelayId) -> Result<()> {
    let relay = output_mut(device, id)?;
    if relay.manual_mode {
        return Err(StateConflict::ManualOverride(id).into());
    }
    relay.state_pin = relay.last_state;
    Ok(())
}

/// Drive the addressed relay to the command's `statePin`.
///
/// An inactive command is a no-op.
pub fn apply(device: &mut Device, command: &OutPower) -> Result<()> {
    if !command.is_use_setting {
        return Ok(());
    }
    let relay = output_mut(device, command.relay_id)?;
    if relay.manual_mode {
        return Err(StateConflict::ManualOverride(command.relay_id).into());
    }
    relay.state_pin = command.state_pin;
    Ok(())
}

/// Drive a relay directly, for sources that compute the level themselves.
pub fn drive(device: &mut Device, id: RelayId, state: bool) -> Result<()> {
    let relay = output_mut(device, id)?;
    if relay.manual_mode {
        return Err(StateConflict::ManualOverride(id).into());
    }
    relay.state_pin = state;
    Ok(())
}
