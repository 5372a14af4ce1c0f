//! Prompt templates for generation, summarization, judging and topic suggestion.

pub const PERFORMANCE_SYSTEM_PROMPT: &str = "You are an expert educational content evaluator specializing in assessing the quality of educational articles.

Your expertise includes:
- Pedagogical effectiveness and educational value
- Factual accuracy and verification
- Content relevance and focus
- Learning outcomes assessment

You provide structured, objective evaluations based on clear criteria.";

pub const ALIGNMENT_SYSTEM_PROMPT: &str = "You are an expert writing style and tone analyst specializing in professional and educational content.

Your expertise includes:
- Professional tone assessment
- Writing style analysis
- Audience appropriateness evaluation
- Linguistic quality assessment

You provide detailed, constructive feedback on tone and style alignment.";

/// Article prompt. `feedback` is the corrective block from a failed evaluation.
pub fn article(topic: &str, context: &str, feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "Write a professional English article (300-400 words) about \"{topic}\".
Use the following context as background material:
{context}

Requirements:
- Tone: formal, factual, and educational (not promotional or opinion-based).
- Structure: 3-4 paragraphs with a clear introduction, body, and conclusion.
- Style: clear, fluent, and vocabulary-rich (C1 level English).
- Include domain-specific terminology naturally in the text.
- Avoid repetition or generic filler phrases."
    );
    if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
        prompt.push_str("\n\n");
        prompt.push_str(feedback);
    }
    prompt
}

pub fn vocabulary_summary(article: &str) -> String {
    format!(
        "Extract 8-12 key vocabulary terms from the following article and provide a clear, concise definition for each term based on how it's used in the article context.
Focus on domain-specific and useful translation-related terminology.

Format EXACTLY as follows (term: definition):
- Term 1: Definition of term 1 in the context of this article
- Term 2: Definition of term 2 in the context of this article

Requirements:
- Each term MUST have a definition after the colon
- Definitions should be 1-2 sentences, contextually relevant to the article
- Use bullet points with dashes (-)

Article:
{article}"
    )
}

pub fn topic_suggestions(n: usize) -> String {
    format!(
        "Generate exactly {n} current, diverse, and professional topics for short English articles.
Each topic should represent a different field (e.g., technology, medicine, law, environment, culture, economics).
Format your response as a simple numbered list with no introduction or commentary.
Example:
1. The Impact of Artificial Intelligence on Legal Systems
2. Advances in Medical Imaging Technology"
    )
}

pub fn performance_evaluation(article: &str, topic: &str, reference: Option<&str>) -> String {
    let context = match reference.filter(|r| !r.trim().is_empty()) {
        Some(r) => format!(
            "\n\n**Reference Context** (from web search):\n{r}\n\nUse this context to verify factual accuracy."
        ),
        None => String::new(),
    };
    format!(
        "Evaluate the following article on **Task Performance** criteria.

**Topic**: {topic}

**Article**:
{article}{context}

Evaluate the article on these THREE criteria, each scored 0-100:

1. **Usefulness**: valuable, clear, educational information with practical examples and domain vocabulary.
2. **Factuality**: accurate, verifiable statements consistent with the reference context; no misleading claims.
3. **Relevance**: stays on topic, every section serves the subject, depth fits the topic.

**Output Format** (JSON only):
{{
    \"usefulness\": {{\"score\": <0-100>, \"explanation\": \"...\", \"strengths\": [\"...\"], \"weaknesses\": [\"...\"]}},
    \"factuality\": {{\"score\": <0-100>, \"explanation\": \"...\", \"verified_facts\": [\"...\"], \"questionable_claims\": [\"...\"], \"errors\": [\"...\"]}},
    \"relevance\": {{\"score\": <0-100>, \"explanation\": \"...\", \"on_topic_sections\": [\"...\"], \"off_topic_sections\": [\"...\"]}},
    \"average_score\": <average of three scores>
}}

Respond ONLY with valid JSON, no markdown formatting or additional text."
    )
}

pub fn alignment_evaluation(article: &str, audience: &str, tone: &str, style: &str) -> String {
    format!(
        "Evaluate the following article on **Alignment** criteria.

**Article**:
{article}

**Expected Characteristics**:
- Target Audience: {audience}
- Expected Tone: {tone}
- Expected Style: {style}

Evaluate the article on these TWO criteria, each scored 0-100:

1. **Tone**: matches \"{tone}\", suits {audience}, consistent and appropriately formal.
2. **Style**: matches \"{style}\", clear sentences, logical paragraphs, correct domain terminology, C1 vocabulary.

**Output Format** (JSON only):
{{
    \"tone\": {{\"score\": <0-100>, \"explanation\": \"...\", \"matches_expected\": true, \"tone_characteristics\": [\"...\"], \"tone_issues\": [\"...\"]}},
    \"style\": {{\"score\": <0-100>, \"explanation\": \"...\", \"matches_expected\": true, \"style_strengths\": [\"...\"], \"style_issues\": [\"...\"], \"vocabulary_level\": \"appropriate/too simple/too complex\"}},
    \"average_score\": <average of two scores>
}}

Respond ONLY with valid JSON, no markdown formatting or additional text."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_prompt_appends_feedback_only_when_present() {
        let plain = article("Maritime law", "ctx", None);
        assert!(plain.contains("\"Maritime law\""));
        assert!(!plain.contains("IMPROVEMENT NEEDED"));

        let blank = article("Maritime law", "ctx", Some("   "));
        assert_eq!(blank, plain);

        let with = article("Maritime law", "ctx", Some("IMPROVEMENT NEEDED:\n- Fix factual errors: x"));
        assert!(with.ends_with("- Fix factual errors: x"));
    }

    #[test]
    fn performance_prompt_includes_reference_when_given() {
        assert!(performance_evaluation("a", "t", Some("facts")).contains("Reference Context"));
        assert!(!performance_evaluation("a", "t", None).contains("Reference Context"));
        assert!(!performance_evaluation("a", "t", Some("")).contains("Reference Context"));
    }
}
