//! Prompt templates for the research pipeline.
//!
//! Wording is presentation detail; what matters to the rest of the crate is
//! the structured reply shape each template requests, which the step parsers
//! rely on.

pub const PLANNER_SYSTEM: &str =
    "You are a research assistant that breaks down complex topics into searchable queries.";

pub const SUMMARIZER_SYSTEM: &str =
    "You are a research assistant that summarizes search results.";

pub const REFLECTOR_SYSTEM: &str = "You are a research quality evaluator.";

pub const REPORT_SYSTEM: &str = "You are a professional research report writer.";

/// Decompose a topic into search queries and section labels.
pub fn plan(query: &str) -> String {
    format!(
        r#"You are a research assistant. Break down the following research query into 3-5 specific search queries and identify key sections to research.

Research Query: {query}

Generate:
1. A list of 3-5 specific search queries (each should be focused and searchable)
2. A list of 3-5 research sections/topics to cover

Respond in JSON format:
{{
    "queries": ["query1", "query2", ...],
    "sections": ["section1", "section2", ...]
}}"#
    )
}

/// Summarize one query's search results.
pub fn summarize(query: &str, results: &str) -> String {
    format!(
        r#"Summarize the following search results for the query: "{query}"

Search Results:
{results}

Provide a concise summary (2-3 sentences) of the key findings."#
    )
}

/// Score research completeness and suggest next actions.
pub fn reflect(status: &str) -> String {
    format!(
        r#"Evaluate the completeness of this research:

{status}

Rate the research completeness on a scale of 0-10 and provide:
1. Completeness score (0-10)
2. What's missing or needs improvement
3. Suggested next actions (if score < 8)

Respond in JSON format:
{{
    "score": 7,
    "feedback": "What's missing...",
    "next_actions": ["action1", "action2"],
    "is_complete": false
}}"#
    )
}

/// Turn accumulated findings into a narrative report.
pub fn report(query: &str, content: &str) -> String {
    format!(
        r#"Based on the following research findings, write a comprehensive, well-structured research report.

Research Query: {query}

Research Findings:
{content}

Write a professional research report with:
1. Executive Summary
2. Detailed findings for each section
3. Key insights and conclusions
4. References to sources

Format the report in markdown."#
    )
}
