//! Test doubles shared by the pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm_client::{Completion, CompletionRequest, CompletionService, LlmError, TokenUsage};
use crate::pipeline::{prompts, AgentKind};

struct Reply {
    text: String,
    usage: Option<TokenUsage>,
}

/// Completion service that answers each agent from its own queue of canned
/// replies and counts calls per agent. An empty queue fails the call.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<HashMap<AgentKind, VecDeque<Reply>>>,
    calls: Mutex<HashMap<AgentKind, usize>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, kind: AgentKind, value: Value) -> &Self {
        self.reply_text(kind, &value.to_string(), None)
    }

    pub fn reply_costing(&self, kind: AgentKind, value: Value, tokens: u32) -> &Self {
        self.reply_text(
            kind,
            &value.to_string(),
            Some(TokenUsage {
                input_tokens: tokens,
                output_tokens: 0,
            }),
        )
    }

    pub fn reply_text(&self, kind: AgentKind, text: &str, usage: Option<TokenUsage>) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(Reply {
                text: text.to_string(),
                usage,
            });
        self
    }

    pub fn calls(&self, kind: AgentKind) -> usize {
        self.calls.lock().unwrap().get(&kind).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, LlmError> {
        let kind = prompts::identify(request.instruction).ok_or(LlmError::EmptyContent)?;
        *self.calls.lock().unwrap().entry(kind).or_default() += 1;
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .ok_or(LlmError::EmptyContent)?;
        Ok(Completion {
            text: reply.text,
            usage: reply.usage,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

/// ~350 characters.
pub const RESUME_TEXT: &str = "Jane Doe\nLocation: Berlin\nSummary: Backend engineer with 6 \
    years of experience building data services.\nSkills: Rust, PostgreSQL, Docker, Kubernetes, \
    Kafka\nCompany: Northwind\nTitle: Senior Engineer\n- Built a Rust ingestion service handling \
    billing events\n- Ran PostgreSQL schema migrations for the ledger\n- Operated Kubernetes \
    clusters on call";

/// ~600 characters.
pub const JOB_TEXT: &str = "Senior Backend Engineer\nCompany: Acme Payments\nLocation: Berlin\n\
    About: Acme builds the payment rails used by thousands of small merchants across Europe. \
    The platform team owns settlement, reconciliation, and the ledger.\n\
    Requirements: Rust and PostgreSQL required. You must have shipped production services.\n\
    Nice to have: Kafka experience is a plus, Terraform is a bonus.\n\
    Responsibilities: design settlement services, review code, improve reliability and on-call \
    health, mentor engineers on the team, and partner with product on the roadmap for the next \
    generation of payouts.\nType: Full-time";

pub fn resume_json() -> Value {
    json!({
        "name": "Jane Doe",
        "location": "Berlin",
        "years_experience": 6,
        "skills": ["Rust", "PostgreSQL", "Docker"],
        "experience": [{
            "title": "Senior Engineer",
            "company": "Northwind",
            "bullets": ["Built a Rust ingestion service"]
        }]
    })
}

pub fn job_json(title: &str) -> Value {
    json!({
        "title": title,
        "company": "Acme",
        "location": "Berlin",
        "must_have_skills": ["Rust", "PostgreSQL"],
        "nice_to_have_skills": ["Kafka"],
        "visa_sponsorship": "unknown",
        "eligible_countries": [],
        "description": "Build payment services."
    })
}

pub fn match_json(score: f64, must_have_coverage: f64) -> Value {
    let recommendation = if score >= 70.0 {
        "apply"
    } else if score >= 55.0 {
        "stretch"
    } else {
        "skip"
    };
    json!({
        "score": score,
        "must_have_coverage": must_have_coverage,
        "nice_to_have_coverage": 0,
        "matched_skills": ["Rust"],
        "missing_skills": ["Kafka"],
        "seniority_fit": "match",
        "recommendation": recommendation,
        "explanation": "Solid overlap on the core stack."
    })
}

pub fn tailored_json() -> Value {
    json!({
        "headline": "Backend Engineer",
        "summary": "Backend engineer focused on Rust and PostgreSQL.",
        "skills": ["Rust", "PostgreSQL", "Docker"],
        "experience": [{
            "title": "Senior Engineer",
            "company": "Northwind",
            "bullets": ["Built a Rust ingestion service"]
        }],
        "keywords": ["Rust", "PostgreSQL"],
        "change_log": ["Led with Rust"],
        "warnings": []
    })
}

pub fn letter_json() -> Value {
    json!({
        "tone": "professional",
        "body": "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.",
        "warnings": []
    })
}

pub fn guard_json(pass: bool) -> Value {
    if pass {
        json!({"verdict": "pass", "issues": [], "placeholders": [], "confidence": 0.92})
    } else {
        json!({
            "verdict": "fail",
            "issues": [{
                "type": "fabrication",
                "field": "skills",
                "original": null,
                "generated": "Terraform",
                "severity": "high"
            }],
            "placeholders": [],
            "confidence": 0.8
        })
    }
}

/// Queues one full tailor → cover letter → guard attempt.
pub fn script_tailor_attempt(script: &ScriptedCompletion, guard_passes: bool) {
    script
        .reply(AgentKind::ResumeTailor, tailored_json())
        .reply(AgentKind::CoverLetterWriter, letter_json())
        .reply(AgentKind::TruthGuard, guard_json(guard_passes));
}
