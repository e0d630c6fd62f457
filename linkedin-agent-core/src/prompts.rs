// linkedin-agent-core/src/prompts.rs

//! System prompt and the instruction templates behind the convenience methods.
//!
//! Each template is deterministic: the same arguments always produce the same
//! instruction, so a convenience call and a manual `chat` with the rendered
//! text are interchangeable.

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a LinkedIn research assistant. \
You have tools that read live LinkedIn data: person profiles, company pages, \
job postings, job searches and the user's recommended jobs. Use them whenever \
a question depends on LinkedIn data instead of guessing. Quote concrete facts \
from the tool results, say plainly when a tool returned nothing useful, and \
keep answers structured and concise.";

/// Remote tool that shuts down the scraper's browser session.
pub const CLOSE_SESSION_TOOL: &str = "close_session";

pub fn recommended_jobs() -> String {
    "Get my recommended jobs from LinkedIn. For each job list the title, company, \
location and a one-sentence summary of why it could be a good fit, then point \
out the two most promising openings."
        .to_string()
}

pub fn profile_insights(profile_url: &str) -> String {
    format!(
        "Get the LinkedIn profile at {} and give me insights about this person: \
current role and company, career trajectory, key skills and education, and \
notable achievements. Finish with three talking points for reaching out.",
        profile_url
    )
}

pub fn company_insights(company_url: &str) -> String {
    format!(
        "Get the LinkedIn company page at {} and give me insights about the company: \
what it does, industry, size, headquarters, recent activity and open roles if \
listed. Finish with an overall assessment as a potential employer.",
        company_url
    )
}

pub fn job_analysis(job: &str) -> String {
    format!(
        "Get the details of the LinkedIn job posting {} and analyze it: \
responsibilities, required and preferred qualifications, seniority, \
compensation if stated, and any red flags. Finish with tips for tailoring an \
application.",
        job
    )
}

pub fn job_search(keywords: &str, location: &str) -> String {
    format!(
        "Search LinkedIn for jobs matching '{}' in {}. List the most relevant \
results with title, company, location and posting link, and summarise the \
common requirements across them.",
        keywords, location
    )
}
