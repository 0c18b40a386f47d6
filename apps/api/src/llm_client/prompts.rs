// Shared prompt fragments. Each agent's own instruction lives in
// pipeline/prompts.rs and is assembled from these.

/// Enforces JSON-only output. Appended to every agent instruction.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT include explanations or apologies.";

/// Grounding rule shared by every agent that reads or rewrites a resume.
pub const GROUNDING_INSTRUCTION: &str = "CRITICAL: Every value you output must be traceable \
    to the source text you were given. Do NOT infer, interpolate, or invent details. \
    If the source does not state something, use null or an empty list.";

/// Placeholder convention for unverifiable strengthening claims.
pub const PLACEHOLDER_INSTRUCTION: &str = "If a stronger claim would help but cannot be \
    verified from the resume, write it as a bracketed placeholder such as [METRIC: reduced \
    latency by X%] and add a matching entry to `warnings`. Never add an employer, date, \
    tool, certification, or metric that is not in the resume.";
