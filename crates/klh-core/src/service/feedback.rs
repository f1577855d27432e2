//! Feedback and grievance submissions.
//!
//! Nothing is stored: a valid submission is logged and acknowledged with a
//! ticket number the student can quote.

use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const PENDING_REVIEW: &str = "Pending Review";

const DEFAULT_CATEGORY: &str = "Facility";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
  #[serde(default)]
  pub subject:  String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub message:  String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReceipt {
  pub msg:            String,
  /// Four digits, 1000 to 9999.
  pub ticket_id:      u32,
  pub status:         String,
  pub submitted_data: FeedbackSubmission,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackService;

impl FeedbackService {
  pub fn submit(&self, submission: FeedbackSubmission) -> Result<FeedbackReceipt> {
    let subject = submission.subject.trim();
    let message = submission.message.trim();
    if subject.is_empty() || message.is_empty() {
      return Err(Error::validation(
        "Subject and Message are required for feedback.",
      ));
    }
    let category = match submission.category.trim() {
      "" => DEFAULT_CATEGORY,
      category => category,
    };

    let ticket_id = OsRng.next_u32() % 9000 + 1000;
    tracing::info!(ticket_id, %subject, %category, "feedback received");

    Ok(FeedbackReceipt {
      msg: "Your feedback has been submitted successfully!".to_owned(),
      ticket_id,
      status: PENDING_REVIEW.to_owned(),
      submitted_data: FeedbackSubmission {
        subject:  subject.to_owned(),
        category: category.to_owned(),
        message:  message.to_owned(),
      },
    })
  }
}
