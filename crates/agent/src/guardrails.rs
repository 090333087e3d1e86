use gpfolio_core::{CapabilityName, CapabilityTaxonomy};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String },
}

/// Checks applied to a request after field validation and before any
/// generation call is made.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestPolicy {
    pub enforce_known_capabilities: bool,
}

impl RequestPolicy {
    pub fn evaluate(
        &self,
        selected: &[CapabilityName],
        taxonomy: &CapabilityTaxonomy,
    ) -> PolicyDecision {
        if !self.enforce_known_capabilities {
            return PolicyDecision::Allow;
        }

        let unknown: Vec<&str> = selected
            .iter()
            .map(CapabilityName::as_str)
            .filter(|name| !taxonomy.contains(name))
            .collect();

        if unknown.is_empty() {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Deny {
                reason_code: "unknown_capability",
                user_message: format!("unknown capabilities: {}", unknown.join(", ")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gpfolio_core::{CapabilityName, CapabilityTaxonomy};

    use super::{PolicyDecision, RequestPolicy};

    fn taxonomy() -> CapabilityTaxonomy {
        CapabilityTaxonomy::parse("Clinical management\n- Safety netting\nMaking decisions\n- Uses tools\n")
    }

    #[test]
    fn permissive_policy_allows_free_text_capabilities() {
        let decision = RequestPolicy::default()
            .evaluate(&[CapabilityName::from("Something else entirely")], &taxonomy());
        assert_eq!(decision, PolicyDecision::Allow);
    }

    #[test]
    fn strict_policy_allows_known_capabilities() {
        let policy = RequestPolicy { enforce_known_capabilities: true };
        let decision = policy.evaluate(
            &[CapabilityName::from("Clinical management"), CapabilityName::from("Making decisions")],
            &taxonomy(),
        );
        assert_eq!(decision, PolicyDecision::Allow);
    }

    #[test]
    fn strict_policy_denies_unknown_capabilities_by_name() {
        let policy = RequestPolicy { enforce_known_capabilities: true };
        let decision = policy.evaluate(
            &[CapabilityName::from("Clinical management"), CapabilityName::from("Juggling")],
            &taxonomy(),
        );

        let (reason_code, user_message) = match decision {
            PolicyDecision::Deny { reason_code, user_message } => (reason_code, user_message),
            PolicyDecision::Allow => ("", String::new()),
        };
        assert_eq!(reason_code, "unknown_capability");
        assert_eq!(user_message, "unknown capabilities: Juggling");
    }
}
