//! Final report printed on stdout when the client stops.

use std::io::{self, Write};

use serde::Serialize;
use tempest::{Focus, ModelSummary};

/// Output format for the final report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// One JSON object
	Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrainReport {
	pub id: String,
	pub title: String,
	pub open: bool,
}

/// Serializable snapshot of the client state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
	pub logged_in: Option<bool>,
	pub grains: Vec<GrainReport>,
	pub packages: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub focused_grain: Option<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<String>,
}

impl From<&ModelSummary> for Report {
	fn from(summary: &ModelSummary) -> Self {
		Self {
			logged_in: summary.logged_in,
			grains: summary
				.grains
				.iter()
				.map(|(id, title)| GrainReport {
					id: id.to_string(),
					title: title.clone(),
					open: summary.open_grains.contains(id),
				})
				.collect(),
			packages: summary.packages.iter().map(ToString::to_string).collect(),
			focused_grain: match &summary.focus {
				Focus::OpenGrain(id) => Some(id.to_string()),
				Focus::GrainList => None,
			},
			errors: summary.errors.clone(),
		}
	}
}

impl Report {
	pub fn write_to(&self, format: OutputFormat, out: &mut impl Write) -> io::Result<()> {
		match format {
			OutputFormat::Json => {
				serde_json::to_writer_pretty(&mut *out, self)?;
				writeln!(out)
			}
			OutputFormat::Text => {
				let login = match self.logged_in {
					None => "pending",
					Some(true) => "ok",
					Some(false) => "failed",
				};
				writeln!(out, "login: {login}")?;
				writeln!(out, "grains: {}", self.grains.len())?;
				for grain in &self.grains {
					let marker = if grain.open { "*" } else { " " };
					writeln!(out, " {marker} {} {}", grain.id, grain.title)?;
				}
				writeln!(out, "packages: {}", self.packages.join(", "))?;
				for error in &self.errors {
					writeln!(out, "error: {error}")?;
				}
				Ok(())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use tempest::GrainId;

	use super::*;

	fn summary() -> ModelSummary {
		ModelSummary {
			logged_in: Some(true),
			grains: [("g1", "Notes"), ("g2", "Board")]
				.into_iter()
				.map(|(id, title)| (GrainId::new(id), title.to_string()))
				.collect(),
			open_grains: vec![GrainId::new("g2")],
			focus: Focus::OpenGrain(GrainId::new("g2")),
			..ModelSummary::default()
		}
	}

	#[test]
	fn json_report() {
		let report = Report::from(&summary());
		let value = serde_json::to_value(&report).unwrap();
		assert_eq!(value["loggedIn"], true);
		assert_eq!(value["focusedGrain"], "g2");
		assert_eq!(value["grains"][1]["open"], true);
		assert!(value.get("errors").is_none());
	}

	#[test]
	fn text_report_marks_open_grains() {
		let mut out = Vec::new();
		Report::from(&summary())
			.write_to(OutputFormat::Text, &mut out)
			.unwrap();
		let text = String::from_utf8(out).unwrap();
		assert!(text.contains("login: ok"));
		assert!(text.contains(" * g2 Board"));
		assert!(text.contains("   g1 Notes"));
	}
}
