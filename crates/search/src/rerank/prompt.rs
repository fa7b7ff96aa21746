use std::fmt::Write;

use crate::model::CandidateDoc;

/// Ranking instructions, the verbatim query and the enumerated candidates
pub fn build_prompt(query: &str, candidates: &[CandidateDoc], max_ids: usize) -> String {
    let mut prompt = String::with_capacity(512 + candidates.len() * 48);

    prompt.push_str("You are a product search ranking system.\n");
    prompt.push_str("Select the product IDs that best match the user query.\n\n");
    prompt.push_str("Rules:\n");
    prompt.push_str("- Consider product names only\n");
    prompt.push_str("- Do NOT invent products or IDs\n");
    prompt.push_str("- Return only IDs that appear in the candidate list\n");
    prompt.push_str("- Order IDs from best to worst match\n");
    prompt.push_str("- If none are relevant, return an empty array\n");
    let _ = writeln!(prompt, "- Return at most {} IDs", max_ids);
    prompt.push_str("- Respond with a JSON array of ID strings\n\n");

    prompt.push_str("User query:\n");
    prompt.push_str(query.trim());
    prompt.push_str("\n\nCandidate products:\n");
    for doc in candidates {
        let _ = writeln!(prompt, "- ID: {}, Name: {}", doc.id, doc.name);
    }

    prompt.push_str("\nOutput format:\n[\"id1\",\"id2\",\"id3\"]\n");
    prompt
}
