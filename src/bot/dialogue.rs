//! Repository-creation dialogue state machine.
//!
//! Pure transition logic: no I/O, no session storage. The engine feeds each
//! text message through [`advance`] and acts on the returned [`Step`].

/// In-progress dialogue state for one user. Absence of a state means the
/// user is idle. Collected fields live inside the variants, so a description
/// can never be recorded before a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueState {
    /// Intent recognized, waiting for the repository name.
    AwaitingName,
    /// Name collected, waiting for the repository description.
    AwaitingDescription { repo_name: String },
}

/// Outcome of feeding one text message into the dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send a prompt and keep the dialogue going in `next`.
    Prompt { reply: String, next: DialogueState },
    /// Intent not recognized; reply and stay idle.
    Reject { reply: String },
    /// All fields collected; submit to the backend and end the dialogue.
    Submit { name: String, description: String },
}

pub const NAME_PROMPT: &str = "Please provide the name of the new repository:";
pub const DESCRIPTION_PROMPT: &str = "Now, please provide a description for the repository:";
pub const CLARIFICATION: &str = "I didn't understand. Please try again or use clear commands.";
pub const CANCELLED: &str = "Operation cancelled.";

/// Phrases that start the repository-creation dialogue (case-insensitive).
const TRIGGER_PHRASES: [&str; 2] = ["create a new project", "new repo"];

/// Whether a message asks to create a repository.
pub fn detects_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRIGGER_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Advance the dialogue by one message.
///
/// The caller owns the session map: it must store `next` on
/// [`Step::Prompt`] and drop the state on every other outcome.
pub fn advance(state: Option<DialogueState>, text: &str) -> Step {
    match state {
        None => {
            if detects_intent(text) {
                Step::Prompt {
                    reply: NAME_PROMPT.to_string(),
                    next: DialogueState::AwaitingName,
                }
            } else {
                Step::Reject {
                    reply: CLARIFICATION.to_string(),
                }
            }
        }
        Some(DialogueState::AwaitingName) => Step::Prompt {
            reply: DESCRIPTION_PROMPT.to_string(),
            next: DialogueState::AwaitingDescription {
                repo_name: text.to_string(),
            },
        },
        Some(DialogueState::AwaitingDescription { repo_name }) => Step::Submit {
            name: repo_name,
            description: text.to_string(),
        },
    }
}
