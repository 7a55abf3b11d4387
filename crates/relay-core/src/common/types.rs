//! Payload types shared between the submission handler, the worker and the
//! result stream.
//!
//! - [`Submission`]: the decoded `POST /` form.
//! - [`Answer`]: the delayed answer a worker produces for one submission.

use crate::common::render;
use core::time::Duration;
use serde::Deserialize;

/// Form body of a `POST /` request.
///
/// A missing `input_text` field decodes as empty text, which is a valid
/// submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub input_text: String,
}

/// The answer produced for a single submission.
///
/// `id` is the submission id handed out by the service when the form was
/// accepted, so the acknowledgment and the answer can be correlated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub id: u64,
}

impl Answer {
    /// Builds the answer for `input` after having waited `delay`.
    pub fn new(input: &str, delay: Duration, id: u64) -> Self {
        Self {
            text: describe(input, delay),
            id,
        }
    }

    /// HTML fragment pushed to the client: `<p id='answer-{id}'>{text}</p>`.
    pub fn fragment(&self) -> String {
        render::answer_fragment(self.id, &self.text)
    }
}

/// Formats the text shown for a submission.
///
/// A zero delay yields the short form used by the immediate acknowledgment.
/// Otherwise the whole number of seconds waited is appended.
pub fn describe(input: &str, delay: Duration) -> String {
    if delay.is_zero() {
        format!("You have entered: {input}")
    } else {
        format!(
            "You have entered: {input}. Waited {} seconds",
            delay.as_secs()
        )
    }
}
