// src/workbench/interpret.rs
// Prompt wording for the Interpret and Generate model calls. Treated as a
// tunable, not a contract (§9 open question #1 / DESIGN.md decision #1):
// free to change wording without being a compatibility break, since only the
// JSON shape on the way back is load-bearing.

use crate::domain::KeywordItem;
use crate::llm::provider::Message;

pub fn build_interpret_messages(description: &str, language: &str) -> Vec<Message> {
    let system = "You are a prompt engineering assistant. Given a free-form description of what \
        the user wants a prompt for, respond with ONLY a JSON object of the shape: \
        {\"topic\": string, \"positive_keywords\": [{\"word\": string, \"weight\": 0-5}], \
        \"negative_keywords\": [{\"word\": string, \"weight\": 0-5}], \"confidence\": 0.0-1.0, \
        \"instructions\": string, \"tags\": [string]}. `topic` is a short title for the subject. \
        `positive_keywords` are concepts to emphasize, `negative_keywords` concepts to exclude. \
        `instructions` is optional guidance for how the eventual prompt body should be written. \
        `tags` are a handful of short categorization labels.";

    vec![
        Message::system(format!("{system} Respond in language: {language}.")),
        Message::user(description),
    ]
}

pub fn build_augment_messages(
    topic: &str,
    existing_positive: &[KeywordItem],
    existing_negative: &[KeywordItem],
    requested_positive: usize,
    requested_negative: usize,
    language: &str,
) -> Vec<Message> {
    let existing_pos_words: Vec<&str> = existing_positive.iter().map(|k| k.word.as_str()).collect();
    let existing_neg_words: Vec<&str> = existing_negative.iter().map(|k| k.word.as_str()).collect();

    let system = "You are a prompt engineering assistant helping expand a keyword collection. \
        Respond with ONLY a JSON object: {\"positive_keywords\": [{\"word\": string, \"weight\": \
        0-5}], \"negative_keywords\": [{\"word\": string, \"weight\": 0-5}]}. Suggest NEW keywords \
        only — do not repeat any keyword already listed as existing. Respect the existing negative \
        keywords as hard exclusions: never suggest a positive keyword that conflicts with one.";

    let user = format!(
        "Topic: {topic}\nExisting positive keywords: {existing_pos_words:?}\nExisting negative \
         keywords: {existing_neg_words:?}\nSuggest up to {requested_positive} new positive and \
         {requested_negative} new negative keywords. Respond in language: {language}."
    );

    vec![Message::system(system), Message::user(user)]
}

pub struct GenerateContext<'a> {
    pub topic: &'a str,
    pub positive: &'a [KeywordItem],
    pub negative: &'a [KeywordItem],
    pub tone: Option<&'a str>,
    pub instructions: Option<&'a str>,
    pub language: &'a str,
    pub include_keyword_reference: bool,
}

pub fn build_generate_messages(ctx: &GenerateContext<'_>) -> Vec<Message> {
    let system = "You are a prompt-writing assistant. Write a single, polished prompt body for the \
        given topic, weaving in the positive keywords (higher weight = more emphasis) and strictly \
        avoiding the negative keywords. Respond with the prompt body text only, no commentary, no \
        surrounding quotes or JSON.";

    let mut user = format!("Topic: {}\n", ctx.topic);

    if ctx.include_keyword_reference {
        let positive: Vec<String> = ctx
            .positive
            .iter()
            .map(|k| format!("{} (weight {})", k.word, k.weight))
            .collect();
        user.push_str(&format!("Emphasize: {}\n", positive.join(", ")));
    } else {
        let positive: Vec<&str> = ctx.positive.iter().map(|k| k.word.as_str()).collect();
        user.push_str(&format!("Emphasize: {}\n", positive.join(", ")));
    }

    if !ctx.negative.is_empty() {
        let negative: Vec<&str> = ctx.negative.iter().map(|k| k.word.as_str()).collect();
        user.push_str(&format!("Exclude/avoid: {}\n", negative.join(", ")));
    }
    if let Some(tone) = ctx.tone {
        user.push_str(&format!("Tone: {tone}\n"));
    }
    if let Some(instructions) = ctx.instructions {
        user.push_str(&format!("Additional instructions: {instructions}\n"));
    }
    user.push_str(&format!("Language: {}\n", ctx.language));

    vec![Message::system(system), Message::user(user)]
}
