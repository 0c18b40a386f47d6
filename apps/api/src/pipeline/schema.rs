//! Shape validators for the six agent outputs.
//!
//! Each validator walks the raw JSON value first so a failure names the exact
//! field path (`experience[2].bullets[0]`), then deserializes into the typed
//! structure.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::pipeline::models::{
    CoverLetter, GuardReport, JobProfile, MatchResult, ResumeProfile, TailoredResume,
};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {message}")]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

type Checked<T> = Result<T, SchemaViolation>;

fn violation(path: impl Into<String>, message: impl Into<String>) -> SchemaViolation {
    SchemaViolation {
        path: path.into(),
        message: message.into(),
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn root(value: &Value) -> Checked<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| violation("$", "expected a JSON object"))
}

/// Absent or null is accepted.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn optional_string(obj: &Map<String, Value>, prefix: &str, key: &str) -> Checked<()> {
    match present(obj, key) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(violation(join(prefix, key), "expected a string or null")),
    }
}

fn required_string(obj: &Map<String, Value>, prefix: &str, key: &str) -> Checked<()> {
    match present(obj, key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(violation(join(prefix, key), "must not be empty")),
        Some(_) => Err(violation(join(prefix, key), "expected a string")),
        None => Err(violation(join(prefix, key), "is required")),
    }
}

fn string_array(obj: &Map<String, Value>, prefix: &str, key: &str) -> Checked<()> {
    let Some(value) = present(obj, key) else {
        return Ok(());
    };
    let items = value
        .as_array()
        .ok_or_else(|| violation(join(prefix, key), "expected an array of strings"))?;
    for (i, item) in items.iter().enumerate() {
        if !item.is_string() {
            return Err(violation(
                format!("{}[{i}]", join(prefix, key)),
                "expected a string",
            ));
        }
    }
    Ok(())
}

fn optional_bool(obj: &Map<String, Value>, prefix: &str, key: &str) -> Checked<()> {
    match present(obj, key) {
        None | Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(violation(join(prefix, key), "expected a boolean or null")),
    }
}

fn number_in(
    obj: &Map<String, Value>,
    prefix: &str,
    key: &str,
    min: f64,
    max: f64,
    required: bool,
) -> Checked<Option<f64>> {
    let Some(value) = present(obj, key) else {
        if required {
            return Err(violation(join(prefix, key), "is required"));
        }
        return Ok(None);
    };
    let n = value
        .as_f64()
        .ok_or_else(|| violation(join(prefix, key), "expected a number"))?;
    if !(min..=max).contains(&n) {
        return Err(violation(
            join(prefix, key),
            format!("{n} is outside {min}..={max}"),
        ));
    }
    Ok(Some(n))
}

fn one_of(
    obj: &Map<String, Value>,
    prefix: &str,
    key: &str,
    allowed: &[&str],
    required: bool,
) -> Checked<()> {
    match present(obj, key) {
        None if required => Err(violation(join(prefix, key), "is required")),
        None => Ok(()),
        Some(Value::String(s)) if allowed.contains(&s.as_str()) => Ok(()),
        Some(_) => Err(violation(
            join(prefix, key),
            format!("expected one of: {}", allowed.join(", ")),
        )),
    }
}

fn object_array(
    obj: &Map<String, Value>,
    prefix: &str,
    key: &str,
    check: impl Fn(&Map<String, Value>, &str) -> Checked<()>,
) -> Checked<()> {
    let Some(value) = present(obj, key) else {
        return Ok(());
    };
    let items = value
        .as_array()
        .ok_or_else(|| violation(join(prefix, key), "expected an array of objects"))?;
    for (i, item) in items.iter().enumerate() {
        let path = format!("{}[{i}]", join(prefix, key));
        let entry = item
            .as_object()
            .ok_or_else(|| violation(path.clone(), "expected an object"))?;
        check(entry, &path)?;
    }
    Ok(())
}

/// Drops null-valued object keys at every depth. The walk already accepted
/// them as absent, and the typed structures default absent fields.
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(without_nulls).collect()),
        other => other.clone(),
    }
}

fn finish<T: DeserializeOwned>(value: &Value) -> Checked<T> {
    serde_json::from_value(without_nulls(value)).map_err(|e| violation("$", e.to_string()))
}

/// Bracketed spans such as `[METRIC: cut costs by X%]`.
pub fn find_placeholders(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find('[') {
        let after = &rest[start + 1..];
        let Some(len) = after.find(']') else {
            break;
        };
        let inner = after[..len].trim();
        if !inner.is_empty() {
            found.push(format!("[{inner}]"));
        }
        rest = &after[len + 1..];
    }
    found
}

// ────────────────────────────────────────────────────────────────────────────
// The six validators
// ────────────────────────────────────────────────────────────────────────────

pub fn validate_resume(value: &Value) -> Checked<ResumeProfile> {
    let obj = root(value)?;
    for key in ["name", "location", "headline", "summary", "work_authorization"] {
        optional_string(obj, "", key)?;
    }
    if let Some(contact) = present(obj, "contact") {
        let contact = contact
            .as_object()
            .ok_or_else(|| violation("contact", "expected an object or null"))?;
        optional_string(contact, "contact", "email")?;
        optional_string(contact, "contact", "phone")?;
        string_array(contact, "contact", "links")?;
    }
    number_in(obj, "", "years_experience", 0.0, 70.0, false)?;
    for key in ["skills", "languages", "certifications"] {
        string_array(obj, "", key)?;
    }
    object_array(obj, "", "experience", |entry, path| {
        for key in ["title", "company", "location", "start", "end"] {
            optional_string(entry, path, key)?;
        }
        string_array(entry, path, "bullets")
    })?;
    object_array(obj, "", "education", |entry, path| {
        for key in ["institution", "degree", "field", "start", "end"] {
            optional_string(entry, path, key)?;
        }
        Ok(())
    })?;
    finish(value)
}

pub fn validate_job(value: &Value) -> Checked<JobProfile> {
    let obj = root(value)?;
    for key in [
        "title",
        "company",
        "location",
        "employment_type",
        "seniority",
        "currency",
        "description",
    ] {
        optional_string(obj, "", key)?;
    }
    let min = number_in(obj, "", "salary_min", 0.0, f64::MAX, false)?;
    let max = number_in(obj, "", "salary_max", 0.0, f64::MAX, false)?;
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(violation("salary_max", "must not be below salary_min"));
        }
    }
    for key in [
        "must_have_skills",
        "nice_to_have_skills",
        "requirements",
        "responsibilities",
        "eligible_countries",
    ] {
        string_array(obj, "", key)?;
    }
    one_of(obj, "", "visa_sponsorship", &["yes", "no", "unknown"], false)?;
    optional_bool(obj, "", "relocation_assistance")?;

    if let Some(countries) = present(obj, "eligible_countries").and_then(Value::as_array) {
        for (i, code) in countries.iter().enumerate() {
            let code = code.as_str().unwrap_or_default();
            let is_alpha2 = code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase());
            if !is_alpha2 {
                return Err(violation(
                    format!("eligible_countries[{i}]"),
                    format!("'{code}' is not an ISO-3166 alpha-2 code"),
                ));
            }
        }
    }
    finish(value)
}

pub fn validate_match(value: &Value) -> Checked<MatchResult> {
    let obj = root(value)?;
    number_in(obj, "", "score", 0.0, 100.0, true)?;
    number_in(obj, "", "must_have_coverage", 0.0, 100.0, true)?;
    number_in(obj, "", "nice_to_have_coverage", 0.0, 100.0, true)?;
    string_array(obj, "", "matched_skills")?;
    string_array(obj, "", "missing_skills")?;
    for key in ["location_fit", "authorization_fit", "visa_fit"] {
        optional_bool(obj, "", key)?;
    }
    one_of(
        obj,
        "",
        "seniority_fit",
        &["match", "over", "under", "unknown"],
        false,
    )?;
    one_of(obj, "", "recommendation", &["apply", "stretch", "skip"], true)?;
    optional_string(obj, "", "explanation")?;
    finish(value)
}

pub fn validate_tailored(value: &Value) -> Checked<TailoredResume> {
    let obj = root(value)?;
    required_string(obj, "", "summary")?;
    optional_string(obj, "", "headline")?;
    for key in ["skills", "keywords", "change_log", "warnings"] {
        string_array(obj, "", key)?;
    }
    object_array(obj, "", "experience", |entry, path| {
        for key in ["title", "company", "start", "end"] {
            optional_string(entry, path, key)?;
        }
        string_array(entry, path, "bullets")
    })?;

    let tailored: TailoredResume = finish(value)?;
    let has_placeholder = !find_placeholders(&tailored.summary).is_empty()
        || tailored
            .experience
            .iter()
            .flat_map(|e| e.bullets.iter())
            .any(|b| !find_placeholders(b).is_empty());
    if has_placeholder && tailored.warnings.is_empty() {
        return Err(violation(
            "warnings",
            "bracketed placeholders present but no warning was recorded",
        ));
    }
    Ok(tailored)
}

pub fn validate_cover_letter(value: &Value) -> Checked<CoverLetter> {
    let obj = root(value)?;
    one_of(
        obj,
        "",
        "tone",
        &["professional", "enthusiastic", "direct"],
        true,
    )?;
    required_string(obj, "", "body")?;
    string_array(obj, "", "warnings")?;

    let letter: CoverLetter = finish(value)?;
    let paragraphs = paragraph_count(&letter.body);
    if paragraphs != 3 {
        return Err(violation(
            "body",
            format!("expected 3 paragraphs, found {paragraphs}"),
        ));
    }
    Ok(letter)
}

pub fn validate_guard_report(value: &Value) -> Checked<GuardReport> {
    let obj = root(value)?;
    one_of(obj, "", "verdict", &["pass", "fail"], true)?;
    object_array(obj, "", "issues", |issue, path| {
        one_of(
            issue,
            path,
            "type",
            &["fabrication", "inconsistency", "exaggeration"],
            true,
        )?;
        required_string(issue, path, "field")?;
        optional_string(issue, path, "original")?;
        optional_string(issue, path, "generated")?;
        one_of(issue, path, "severity", &["low", "medium", "high"], true)
    })?;
    string_array(obj, "", "placeholders")?;
    number_in(obj, "", "confidence", 0.0, 1.0, true)?;
    finish(value)
}

/// Paragraphs are separated by one or more blank lines.
pub fn paragraph_count(body: &str) -> usize {
    body.replace("\r\n", "\n")
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resume_minimal_is_valid() {
        let resume = validate_resume(&json!({"skills": ["Rust"]})).unwrap();
        assert_eq!(resume.skills, vec!["Rust"]);
        assert!(resume.work_authorization.is_none());
    }

    #[test]
    fn test_resume_null_fields_become_defaults() {
        let resume = validate_resume(&json!({
            "name": "Jane",
            "contact": null,
            "skills": ["Rust"],
            "languages": null,
            "certifications": null,
            "experience": [{"title": "Engineer", "company": null, "bullets": null}],
            "education": null,
            "years_experience": null
        }))
        .unwrap();
        assert_eq!(resume.contact, Default::default());
        assert!(resume.languages.is_empty());
        assert!(resume.certifications.is_empty());
        assert!(resume.education.is_empty());
        assert!(resume.experience[0].bullets.is_empty());
        assert!(resume.experience[0].company.is_none());
        assert!(resume.years_experience.is_none());
    }

    #[test]
    fn test_resume_null_contact_links() {
        let resume = validate_resume(&json!({
            "contact": {"email": "jane@example.com", "phone": null, "links": null}
        }))
        .unwrap();
        assert_eq!(resume.contact.email.as_deref(), Some("jane@example.com"));
        assert!(resume.contact.links.is_empty());
    }

    #[test]
    fn test_job_null_fields_become_defaults() {
        let job = validate_job(&json!({
            "title": "Backend Engineer",
            "visa_sponsorship": null,
            "must_have_skills": null,
            "nice_to_have_skills": null,
            "requirements": null,
            "responsibilities": null,
            "eligible_countries": null,
            "relocation_assistance": null,
            "salary_min": null
        }))
        .unwrap();
        assert_eq!(job.visa_sponsorship, crate::pipeline::models::VisaSponsorship::Unknown);
        assert!(job.requirements.is_empty());
        assert!(job.must_have_skills.is_empty());
        assert!(job.eligible_countries.is_empty());
        assert!(job.relocation_assistance.is_none());
    }

    #[test]
    fn test_match_null_fields_become_defaults() {
        let result = validate_match(&json!({
            "score": 62,
            "must_have_coverage": 80,
            "nice_to_have_coverage": 0,
            "matched_skills": null,
            "missing_skills": null,
            "location_fit": null,
            "seniority_fit": null,
            "recommendation": "stretch",
            "explanation": null
        }))
        .unwrap();
        assert!(result.matched_skills.is_empty());
        assert_eq!(result.seniority_fit, crate::pipeline::models::SeniorityFit::Unknown);
        assert_eq!(result.explanation, "");
    }

    #[test]
    fn test_null_required_field_is_still_rejected() {
        let err = validate_match(&json!({
            "score": 62,
            "must_have_coverage": 80,
            "nice_to_have_coverage": 0,
            "recommendation": null
        }))
        .unwrap_err();
        assert_eq!(err.path, "recommendation");
    }

    #[test]
    fn test_tailored_and_guard_null_lists() {
        let tailored = validate_tailored(&json!({
            "summary": "Backend engineer.",
            "headline": null,
            "keywords": null,
            "change_log": null,
            "warnings": null
        }))
        .unwrap();
        assert!(tailored.keywords.is_empty());

        let report = validate_guard_report(&json!({
            "verdict": "pass",
            "issues": null,
            "placeholders": null,
            "confidence": 0.9
        }))
        .unwrap();
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_resume_rejects_non_object() {
        let err = validate_resume(&json!(["Rust"])).unwrap_err();
        assert_eq!(err.path, "$");
    }

    #[test]
    fn test_resume_nested_path_reported() {
        let err = validate_resume(&json!({
            "experience": [
                {"title": "Engineer", "bullets": ["Shipped"]},
                {"title": "Lead", "bullets": ["Led", 42]}
            ]
        }))
        .unwrap_err();
        assert_eq!(err.path, "experience[1].bullets[1]");
    }

    #[test]
    fn test_resume_years_out_of_range() {
        let err = validate_resume(&json!({"years_experience": 120})).unwrap_err();
        assert_eq!(err.path, "years_experience");
    }

    #[test]
    fn test_job_rejects_non_iso_country() {
        let err = validate_job(&json!({
            "title": "Backend Engineer",
            "eligible_countries": ["DE", "Germany"]
        }))
        .unwrap_err();
        assert_eq!(err.path, "eligible_countries[1]");
    }

    #[test]
    fn test_job_rejects_inverted_salary() {
        let err = validate_job(&json!({"salary_min": 90000, "salary_max": 70000})).unwrap_err();
        assert_eq!(err.path, "salary_max");
    }

    #[test]
    fn test_job_visa_enum() {
        assert!(validate_job(&json!({"visa_sponsorship": "maybe"})).is_err());
        let job = validate_job(&json!({"visa_sponsorship": "yes", "eligible_countries": []})).unwrap();
        assert_eq!(job.visa_sponsorship, crate::pipeline::models::VisaSponsorship::Yes);
    }

    #[test]
    fn test_match_requires_score_in_range() {
        let err = validate_match(&json!({
            "score": 140,
            "must_have_coverage": 50,
            "nice_to_have_coverage": 0,
            "recommendation": "apply"
        }))
        .unwrap_err();
        assert_eq!(err.path, "score");

        let err = validate_match(&json!({
            "score": 60,
            "nice_to_have_coverage": 0,
            "recommendation": "stretch"
        }))
        .unwrap_err();
        assert_eq!(err.path, "must_have_coverage");
    }

    #[test]
    fn test_match_valid() {
        let result = validate_match(&json!({
            "score": 72.5,
            "must_have_coverage": 80,
            "nice_to_have_coverage": 50,
            "matched_skills": ["Rust"],
            "missing_skills": ["Kafka"],
            "location_fit": true,
            "authorization_fit": null,
            "seniority_fit": "match",
            "recommendation": "apply",
            "explanation": "Strong Rust overlap."
        }))
        .unwrap();
        assert!((result.score - 72.5).abs() < f64::EPSILON);
        assert!(result.authorization_fit.is_none());
    }

    #[test]
    fn test_tailored_placeholder_needs_warning() {
        let err = validate_tailored(&json!({
            "summary": "Backend engineer who [METRIC: cut latency by X%]",
            "warnings": []
        }))
        .unwrap_err();
        assert_eq!(err.path, "warnings");

        assert!(validate_tailored(&json!({
            "summary": "Backend engineer who [METRIC: cut latency by X%]",
            "warnings": ["Confirm the latency metric"]
        }))
        .is_ok());
    }

    #[test]
    fn test_tailored_requires_summary() {
        let err = validate_tailored(&json!({"skills": ["Rust"]})).unwrap_err();
        assert_eq!(err.path, "summary");
    }

    #[test]
    fn test_cover_letter_needs_three_paragraphs() {
        let err = validate_cover_letter(&json!({
            "tone": "direct",
            "body": "One.\n\nTwo."
        }))
        .unwrap_err();
        assert_eq!(err.path, "body");

        let letter = validate_cover_letter(&json!({
            "tone": "direct",
            "body": "One.\n\nTwo.\n\n\nThree."
        }))
        .unwrap();
        assert_eq!(paragraph_count(&letter.body), 3);
    }

    #[test]
    fn test_guard_issue_path() {
        let err = validate_guard_report(&json!({
            "verdict": "fail",
            "issues": [{"type": "invention", "field": "summary", "severity": "high"}],
            "confidence": 0.8
        }))
        .unwrap_err();
        assert_eq!(err.path, "issues[0].type");
    }

    #[test]
    fn test_guard_confidence_bounds() {
        let err = validate_guard_report(&json!({"verdict": "pass", "confidence": 1.5})).unwrap_err();
        assert_eq!(err.path, "confidence");
    }

    #[test]
    fn test_find_placeholders() {
        assert_eq!(
            find_placeholders("Led [TEAM SIZE] engineers, cut cost by [X%]"),
            vec!["[TEAM SIZE]", "[X%]"]
        );
        assert!(find_placeholders("no brackets [ ] here").is_empty());
        assert!(find_placeholders("unterminated [oops").is_empty());
    }
}
