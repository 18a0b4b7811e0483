mod commands;
mod state;

pub(crate) use commands::{
    AdminCommand, ConsoleCommandProcessor, DebugAction, GameAction, TuneAction, WindowGrade,
};
pub(crate) use state::ConsoleState;
