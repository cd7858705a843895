//! Prompts for profile extraction, retry-fill and archetype matching.

use crate::interview::SchemaField;

/// Fields listed first in extraction prompts.
pub const PRIORITY_FIELDS: &[&str] = &[
    "name",
    "age",
    "birth_city",
    "current_city",
    "university",
    "current_position",
];

pub const EXTRACTION_SYSTEM: &str =
    "You are a data extraction assistant. Output only valid JSON.";

/// Build the single-pass extraction prompt over the whole schema.
pub fn extraction_prompt(schema: &[SchemaField], transcript: &str) -> String {
    format!(
        "Build a user profile in JSON format from the interview text below.\n\n\
         INSTRUCTIONS:\n\
         1. Fill in every field from the list below\n\
         2. If the text has no information for a field, use null\n\
         3. Arrays must hold concrete values, not generic phrases\n\
         4. Numeric fields must be numbers, string fields must be strings\n\
         5. Be precise and specific\n\
         6. Return ONLY valid JSON, no markdown and no comments\n\n\
         FIELDS:\n{fields}\n\
         FILLING RULES:\n\
         - name: the user's full name\n\
         - age: age as a number\n\
         - birth_city/current_city: city names\n\
         - hard_skills: concrete technical skills [\"Python\", \"React\", \"SQL\"]\n\
         - soft_skills: personal qualities [\"communication\", \"leadership\"]\n\
         - hobbies: concrete hobbies [\"football\", \"photography\"]\n\
         - personality_traits, values, career_goals: short concrete phrases\n\n\
         INTERVIEW TEXT:\n{transcript}\n\n\
         ANSWER (JSON only):",
        fields = describe_fields(schema.iter().collect()),
    )
}

/// Build a prompt asking only for the fields still missing.
pub fn fill_prompt(schema: &[SchemaField], missing: &[String], transcript: &str) -> String {
    let requested: Vec<&SchemaField> = schema
        .iter()
        .filter(|f| missing.contains(&f.name))
        .collect();
    format!(
        "Some profile fields could not be filled on the first pass. Read the interview \
         text again and infer values for ONLY these fields. Make a reasonable inference \
         from context where the text is indirect; use null only if there is truly no \
         basis for a value.\n\n\
         FIELDS:\n{fields}\n\
         INTERVIEW TEXT:\n{transcript}\n\n\
         Respond with ONLY a JSON object containing exactly these keys.",
        fields = describe_fields(requested),
    )
}

/// Build the archetype-match prompt for a finished profile.
pub fn archetype_prompt(profile_json: &str) -> String {
    format!(
        "You are a personality-profile analyst. The input is a JSON profile describing a \
         person's personality, values, behaviour and motivations.\n\n\
         Based on this data, determine which archetype or personality type fits the \
         profile best.\n\n\
         Answer strictly in JSON:\n\
         {{\n  \"profile_match.name\": \"Archetype name\",\n  \
         \"profile_match.id\": \"identifier in English\",\n  \
         \"profile_match.summary\": \"Short explanation of why this type was chosen\"\n}}\n\n\
         Input profile:\n{profile_json}\n"
    )
}

/// One line per field, priority fields first.
fn describe_fields(fields: Vec<&SchemaField>) -> String {
    let (mut priority, rest): (Vec<&SchemaField>, Vec<&SchemaField>) = fields
        .into_iter()
        .partition(|f| PRIORITY_FIELDS.contains(&f.name.as_str()));
    priority.sort_by_key(|f| {
        PRIORITY_FIELDS
            .iter()
            .position(|p| *p == f.name)
            .unwrap_or(usize::MAX)
    });

    let mut out = String::new();
    for field in priority.into_iter().chain(rest) {
        if field.is_array {
            out.push_str(&format!("- {}: [] (array)\n", field.name));
        } else if field.is_object {
            out.push_str(&format!("- {}: {{}} (object)\n", field.name));
        } else {
            out.push_str(&format!("- {}: {}\n", field.name, field.field_type));
        }
    }
    out
}
