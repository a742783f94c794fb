// Skill-match prompt template and composer.
// All prompt text for the analysis module is defined here.

pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are a helpful assistant that extracts skills and experience from resumes and compares them to a job description.
Your response MUST be a valid JSON object with the following keys:
- "match_percentage" (number 0-100)
- "matched_skills" (array of strings)
- "missing_skills" (array of strings)
- "summary" (short string, 1-2 sentences)
- "suggestions" (array of short strings)

Resume:
"""{resume_text}"""

Job description:
"""{job_description}"""

Analyze technical and soft skills. Prioritize explicit skill mentions, but also infer likely skills from role titles and past experiences.
"#;

/// Builds the analysis prompt for one request.
///
/// Backticks in either input become single quotes so user text cannot open or close a
/// code fence inside the prompt. Substitution is single-pass: a literal `{job_description}`
/// inside the resume is left alone.
pub fn compose_prompt(resume_text: &str, job_description: &str) -> String {
    let resume = sanitize(resume_text);
    let job = sanitize(job_description);
    fill_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[("resume_text", resume.as_str()), ("job_description", job.as_str())],
    )
}

fn sanitize(input: &str) -> String {
    input.replace('`', "'")
}

/// Replaces each `{name}` placeholder in `template` exactly once per occurrence,
/// never rescanning substituted text.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    'scan: while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        for (name, value) in values {
            if let Some(after) = tail.strip_prefix(name).and_then(|t| t.strip_prefix('}')) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        out.push('{');
        rest = tail;
    }

    out.push_str(rest);
    out
}
