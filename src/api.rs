//! Typed callers for the categorization API.
//!
//! These are ordinary protected calls: they travel through the interceptor like any other
//! request and need no refresh handling of their own.

// self
use crate::{_prelude::*, session::Session};

/// Relative path of the prediction endpoint.
pub const PREDICT_PATH: &str = "predict";
/// Relative path of the feedback endpoint.
pub const FEEDBACK_PATH: &str = "feedback";

/// Expense to categorize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictRequest {
	/// Vendor name printed on the bill.
	pub vendor: String,
	/// Free-text line description.
	pub description: String,
}
impl PredictRequest {
	/// Creates a prediction request.
	pub fn new(vendor: impl Into<String>, description: impl Into<String>) -> Self {
		Self { vendor: vendor.into(), description: description.into() }
	}
}

/// Predicted category plus the ranked candidates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
	/// Best-scoring category.
	pub category: String,
	/// Top candidates as `(category, probability)` pairs, best first.
	#[serde(default)]
	pub top: Vec<(String, f64)>,
}

/// Correction submitted for a prediction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
	/// Vendor name printed on the bill.
	pub vendor: String,
	/// Free-text line description.
	pub description: String,
	/// Category the user considers correct.
	pub category: String,
	/// Bill date, when known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date: Option<String>,
	/// Bill amount, when known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount: Option<f64>,
}
impl FeedbackRequest {
	/// Creates feedback for a prediction request.
	pub fn new(prediction: PredictRequest, category: impl Into<String>) -> Self {
		Self {
			vendor: prediction.vendor,
			description: prediction.description,
			category: category.into(),
			date: None,
			amount: None,
		}
	}

	/// Attaches the bill date.
	pub fn with_date(mut self, date: impl Into<String>) -> Self {
		self.date = Some(date.into());

		self
	}

	/// Attaches the bill amount.
	pub fn with_amount(mut self, amount: f64) -> Self {
		self.amount = Some(amount);

		self
	}
}

/// Acknowledgement of submitted feedback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResponse {
	/// Server status label (`"queued"` when accepted).
	pub status: String,
	/// Human-readable acknowledgement.
	#[serde(default)]
	pub message: String,
}

impl Session {
	/// Requests a category prediction.
	pub async fn predict(&self, request: &PredictRequest) -> Result<PredictResponse> {
		self.post_json(PREDICT_PATH, request).await
	}

	/// Submits a category correction.
	pub async fn feedback(&self, request: &FeedbackRequest) -> Result<FeedbackResponse> {
		self.post_json(FEEDBACK_PATH, request).await
	}
}
