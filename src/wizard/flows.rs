//! The two question flows. Static data: strictly linear, no branching.

use serde::Serialize;

use super::state::FlowType;

/// One question shown to the user. `key` names the answer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Question {
    pub key: &'static str,
    pub prompt: &'static str,
}

/// An ordered, immutable question list.
#[derive(Debug)]
pub struct FlowDefinition {
    pub flow: FlowType,
    pub questions: &'static [Question],
}

impl FlowDefinition {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn question(&self, index: usize) -> Option<&'static Question> {
        self.questions.get(index)
    }
}

pub static INTAKE: FlowDefinition = FlowDefinition {
    flow: FlowType::Intake,
    questions: &[
        Question {
            key: "currentRevenue",
            prompt: "What is your current monthly revenue (roughly)?",
        },
        Question {
            key: "offer",
            prompt: "Describe your main offer(s) in 1-3 sentences.",
        },
        Question {
            key: "niche",
            prompt: "Who is your target niche / ideal client?",
        },
        Question {
            key: "leadSources",
            prompt: "What are your main lead sources right now?",
        },
        Question {
            key: "salesProcess",
            prompt: "Describe your sales process (DM -> call, VSL -> call, etc.).",
        },
        Question {
            key: "teamSize",
            prompt: "What is your current team size and key roles?",
        },
        Question {
            key: "techStack",
            prompt: "What CRM/tech stack do you use (e.g. GHL)?",
        },
        Question {
            key: "bottlenecks",
            prompt: "What do you feel are your biggest bottlenecks? \
                     (e.g. lead gen, offer, sales, fulfillment, retention, mindset, hiring)",
        },
        Question {
            key: "goals",
            prompt: "What is your target monthly revenue and by when?",
        },
        Question {
            key: "faithPreference",
            prompt: "How much do you want faith / Christian language integrated? (off, light, strong)",
        },
    ],
};

pub static OFFER_BUILDER: FlowDefinition = FlowDefinition {
    flow: FlowType::OfferBuilder,
    questions: &[
        Question {
            key: "avatar",
            prompt: "Who is your target avatar? (be specific)",
        },
        Question {
            key: "problem",
            prompt: "What painful problem do you solve for them?",
        },
        Question {
            key: "promise",
            prompt: "What outcome or transformation do you promise?",
        },
        Question {
            key: "pricePoint",
            prompt: "What is your current or ideal price point?",
        },
        Question {
            key: "proof",
            prompt: "What proof or case studies do you have (or can we create)?",
        },
    ],
};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn flow_lengths() {
        assert_eq!(INTAKE.len(), 10);
        assert_eq!(OFFER_BUILDER.len(), 5);
    }

    #[test]
    fn keys_are_unique_within_each_flow() {
        for def in [&INTAKE, &OFFER_BUILDER] {
            let keys: HashSet<_> = def.questions.iter().map(|q| q.key).collect();
            assert_eq!(keys.len(), def.len(), "duplicate key in {}", def.flow);
        }
    }

    #[test]
    fn definitions_match_their_flow() {
        assert_eq!(INTAKE.flow, FlowType::Intake);
        assert_eq!(OFFER_BUILDER.flow, FlowType::OfferBuilder);
        assert_eq!(INTAKE.question(2).map(|q| q.key), Some("niche"));
        assert!(OFFER_BUILDER.question(5).is_none());
    }
}
