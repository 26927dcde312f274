// LLM prompt constants for job curation.

/// Curation instruction. The profile and the job description are appended
/// verbatim by `build_curation_prompt`.
pub const CURATION_PROMPT: &str = r#"
You are a job hiring assistant.
You will receive a candidate profile and a job description.
Your task is to answer the following questions:
On a scale of 0 to 5, how suitable is the candidate for the job, with 5 being most suitable.
What are the main tasks of the job?
What area is this job in?
How well do the candidate's skills and interests match the description?
Are there skills that the candidate lacks?
Is the candidate suitably qualified?
Is the candidate a good fit for this role?
Answer concisely using an objective tone.
Output your answer as json with the following format:
{
    "Suitability": <int[0-5]>,
    "Job_summary": "<string>",
    "Match_summary": "<string>"
}
The Job_summary and Match_summary fields should be no longer than one paragraph each.
Output only valid json with double quotation marks around fields and values.
Be sure that the field names exactly match the description: Suitability, Job_summary, Match_summary.
Output only valid json. Do not add anything outside the json.
Do not add a note or explanation.
"#;

/// Builds the full curation prompt for one job.
pub fn build_curation_prompt(profile: &str, description: &str) -> String {
    format!("{CURATION_PROMPT} The profile is:{profile}. The job description is: {description}")
}
