mod callback_handler;
mod command_handler;
mod message_handler;

pub use callback_handler::callback_handler;
pub use command_handler::{command_handler, Command};
pub use message_handler::{is_broadcast_text, message_handler};

use teloxide::{dispatching::UpdateHandler, prelude::*, RequestError};

/// Update routing shared by polling and webhook mode.
pub fn schema() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler))
}

/// Store failures never abort an update; they are logged and the handler
/// carries on with what it has.
fn logged<T>(result: rusqlite::Result<T>, what: &str) -> Option<T> {
    result
        .map_err(|e| log::error!("Error {what}: {e}"))
        .ok()
}
