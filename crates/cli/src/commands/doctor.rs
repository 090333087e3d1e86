use gpfolio_core::config::{AppConfig, LoadOptions};
use gpfolio_core::extraction::capability_cascade;
use gpfolio_core::{load_taxonomy, CapabilityTaxonomy, PromptComposer, SectionExtractor};
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let (check, taxonomy) = check_taxonomy(&config);
            checks.push(check);
            checks.push(check_prompt_templates(taxonomy.as_ref()));
            checks.push(check_section_patterns(taxonomy.as_ref()));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "capability_taxonomy",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(check_prompt_templates(None));
            checks.push(check_section_patterns(None));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_taxonomy(config: &AppConfig) -> (DoctorCheck, Option<CapabilityTaxonomy>) {
    let source = config
        .capabilities
        .source_path
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());

    match load_taxonomy(config.capabilities.source_path.as_deref()) {
        Ok(taxonomy) => (
            DoctorCheck {
                name: "capability_taxonomy",
                status: CheckStatus::Pass,
                details: format!("{} capability groups parsed from {source}", taxonomy.len()),
            },
            Some(taxonomy),
        ),
        Err(error) => (
            DoctorCheck {
                name: "capability_taxonomy",
                status: CheckStatus::Fail,
                details: error.to_string(),
            },
            None,
        ),
    }
}

/// Renders a full review prompt so template syntax errors surface here
/// rather than on the first request.
fn check_prompt_templates(taxonomy: Option<&CapabilityTaxonomy>) -> DoctorCheck {
    let sample: Vec<_> = taxonomy
        .map(|taxonomy| taxonomy.names().take(1).cloned().collect())
        .unwrap_or_else(|| vec!["Clinical management".into()]);

    let rendered = PromptComposer::new().and_then(|composer| {
        composer.review_messages("Doctor check: sample case description.", &sample)
    });

    match rendered {
        Ok(messages) => DoctorCheck {
            name: "prompt_templates",
            status: CheckStatus::Pass,
            details: format!("review prompt rendered into {} messages", messages.len()),
        },
        Err(error) => {
            DoctorCheck { name: "prompt_templates", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

/// Compiles the fixed section patterns and one capability cascade per
/// taxonomy group.
fn check_section_patterns(taxonomy: Option<&CapabilityTaxonomy>) -> DoctorCheck {
    if let Err(error) = SectionExtractor::new() {
        return DoctorCheck { name: "section_patterns", status: CheckStatus::Fail, details: error.to_string() };
    }

    let Some(taxonomy) = taxonomy else {
        return DoctorCheck {
            name: "section_patterns",
            status: CheckStatus::Pass,
            details: "section patterns compiled; no taxonomy to check capability patterns".to_string(),
        };
    };

    match taxonomy.names().try_for_each(|name| capability_cascade(name).map(|_| ())) {
        Ok(()) => DoctorCheck {
            name: "section_patterns",
            status: CheckStatus::Pass,
            details: format!("section patterns compiled for {} capabilities", taxonomy.len()),
        },
        Err(error) => {
            DoctorCheck { name: "section_patterns", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
