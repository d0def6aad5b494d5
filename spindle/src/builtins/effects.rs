//! Built-in effects.

use crate::host::{Entity, Player, Position};
use spindle_core::{Effect, EvalError, Expression, RegistrationError, ScriptEvent};
use spindle_std::syntax::{EffectSyntax, ParseResult, SyntaxRegistryBuilder};
use std::fmt;

pub(super) fn register(syntax: &mut SyntaxRegistryBuilder) -> Result<(), RegistrationError> {
    syntax.effect::<Teleport>(&["teleport %entities% to %position%"])?;

    syntax.effect_fn(
        "Message",
        &["(message|send) %strings% [recipients:to %players%]"],
        |mut result: ParseResult| {
            let messages = result.take(0)?;
            let explicit = result.has_tag("recipients");
            Some(Box::new(Message {
                messages,
                recipients: result.take(1),
                explicit,
            }) as Box<dyn Effect>)
        },
    )?;

    syntax.effect::<SetCancelled>(&["(cancel|uncancel:uncancel) [the] event"])?;
    Ok(())
}

/// `teleport %entities% to %position%`
#[derive(Debug)]
pub struct Teleport {
    targets: Box<dyn Expression>,
    destination: Box<dyn Expression>,
}

impl EffectSyntax for Teleport {
    fn init(mut result: ParseResult) -> Option<Self> {
        Some(Self {
            targets: result.take(0)?,
            destination: result.take(1)?,
        })
    }
}

impl Effect for Teleport {
    fn execute(&self, event: &dyn ScriptEvent) -> Result<(), EvalError> {
        let destination = self.destination.require::<Position>(event)?;
        for entity in self.targets.all::<Entity>(event)? {
            if !entity.teleport(destination) {
                tracing::debug!(
                    target: "spindle::script",
                    entity = %entity.name(),
                    "host refused teleport"
                );
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "teleport {} to {}",
            self.targets.describe(),
            self.destination.describe()
        )
    }
}

/// `(message|send) %strings% [to %players%]`
///
/// Without recipients the message goes to the event's player. When the
/// event has none, nothing is sent.
pub struct Message {
    messages: Box<dyn Expression>,
    recipients: Option<Box<dyn Expression>>,
    explicit: bool,
}

impl Effect for Message {
    fn execute(&self, event: &dyn ScriptEvent) -> Result<(), EvalError> {
        let messages = self.messages.all::<String>(event)?;
        let recipients = match &self.recipients {
            Some(recipients) => recipients.all::<Player>(event)?,
            None => {
                tracing::trace!(
                    target: "spindle::script",
                    event = event.event_name(),
                    "message has no recipients"
                );
                return Ok(());
            }
        };
        for player in &recipients {
            for message in &messages {
                player.send_message(message);
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match (&self.recipients, self.explicit) {
            (Some(recipients), true) => format!(
                "message {} to {}",
                self.messages.describe(),
                recipients.describe()
            ),
            _ => format!("message {}", self.messages.describe()),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("messages", &self.messages)
            .field("recipients", &self.recipients)
            .finish_non_exhaustive()
    }
}

/// `cancel [the] event` and `uncancel [the] event`
#[derive(Debug)]
pub struct SetCancelled {
    cancel: bool,
}

impl EffectSyntax for SetCancelled {
    fn init(result: ParseResult) -> Option<Self> {
        Some(Self {
            cancel: !result.has_tag("uncancel"),
        })
    }
}

impl Effect for SetCancelled {
    fn execute(&self, event: &dyn ScriptEvent) -> Result<(), EvalError> {
        let cancellable = event.as_cancellable().ok_or(EvalError::TypeMismatch {
            expected: "cancellable event",
            found: event.event_name(),
        })?;
        cancellable.set_cancelled(self.cancel);
        Ok(())
    }

    fn describe(&self) -> String {
        let verb = if self.cancel { "cancel" } else { "uncancel" };
        format!("{verb} the event")
    }
}
