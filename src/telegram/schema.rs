//! dptree handler schema and the shared handler dependencies.

use std::sync::Arc;

use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use super::bot::Command;
use super::request::RequestState;
use super::{admin, callbacks, commands, request};
use crate::core::config::Settings;
use crate::google::drive::DriveClient;
use crate::google::sheets::SheetsClient;
use crate::services::users::UserService;

/// Everything a handler may need, cloned into the dptree context.
#[derive(Clone)]
pub struct HandlerDeps {
    pub settings: Arc<Settings>,
    pub sheets: Arc<SheetsClient>,
    pub drive: Arc<DriveClient>,
    pub users: Arc<UserService>,
}

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type HandlerResult = Result<(), HandlerError>;

pub fn schema() -> UpdateHandler<HandlerError> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        // /cancel works in any dialogue state
        .branch(case![Command::Cancel].endpoint(request::cancel))
        .branch(
            case![RequestState::AwaitingPhoto { request }]
                .branch(case![Command::Skip].endpoint(request::skip_photo)),
        )
        .branch(
            case![RequestState::Idle]
                .branch(case![Command::Start].endpoint(commands::start))
                .branch(case![Command::Myid].endpoint(commands::my_id))
                .branch(case![Command::New].endpoint(request::start_request))
                .branch(case![Command::Listusers].endpoint(admin::list_users))
                .branch(case![Command::Adduser(args)].endpoint(admin::add_user))
                .branch(case![Command::Deluser(args)].endpoint(admin::delete_user)),
        );

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(case![RequestState::AwaitingLocation { request }].endpoint(request::receive_location))
        .branch(case![RequestState::AwaitingIssueType { request }].endpoint(request::receive_issue_type))
        .branch(case![RequestState::AwaitingPhoto { request }].endpoint(request::receive_photo))
        .branch(dptree::endpoint(commands::fallback));

    let callback_handler = Update::filter_callback_query().endpoint(callbacks::dispatch);

    dialogue::enter::<Update, InMemStorage<RequestState>, RequestState, _>()
        .branch(message_handler)
        .branch(callback_handler)
}
