use super::tools::ToolSpec;

const WORKERS: &[(&str, &str)] = &[
    (
        "information_node",
        "Handles inquiries related to doctor availability, hospital FAQs, and general information.",
    ),
    (
        "booking_node",
        "Responsible for managing appointment bookings, cancellations, and rescheduling tasks.",
    ),
];

pub fn supervisor_prompt() -> String {
    let mut workers = WORKERS
        .iter()
        .map(|(name, description)| format!("WORKER: {name} \nDESCRIPTION: {description}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    workers.push_str(
        "\n\nWORKER: FINISH \nDESCRIPTION: If the user's query is resolved, route to FINISH.",
    );

    format!(
        r#"You are a supervisor tasked with managing a conversation between the following workers.

### SPECIALIZED ASSISTANTS:
{workers}

Your primary responsibility is to help users manage doctor appointments and respond to hospital-related queries.
Based on the user's intent, route their request to the most appropriate assistant.
Each assistant will perform a task and return results with a status update. Once all relevant tasks are complete, respond with FINISH.

**OPERATIONAL RULES:**
1. If the user's query is clearly resolved with no further action required, respond with FINISH.
2. If there are repeated or circular interactions without progress, respond with FINISH.
3. If more than 10 total steps are taken in a session, respond with FINISH to prevent infinite loops.
4. Always refer to the conversation history to determine if the user's goal has been met. If it has, respond with FINISH.

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{{"next": "information_node|booking_node|FINISH", "reasoning": "why you chose this route"}}
"#
    )
}

pub fn identification_note(id_number: i64) -> String {
    format!("User's identification number is {id_number}")
}

pub fn worker_prompt(role: &str, tools: &[ToolSpec], id_number: i64, year: i32) -> String {
    let tool_list = tools
        .iter()
        .map(|t| format!("- {}: {}\n  arguments: {}", t.name, t.description, t.arguments))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{role} Always consider the year to be {year}.
The patient's identification number is {id_number}.

You can use these tools:
{tool_list}

Dates are written DD-MM-YYYY and date-times DD-MM-YYYY HH:MM (24-hour clock, zero padded).

To use a tool, reply with ONLY this JSON and nothing else:
{{"tool": "<tool name>", "arguments": {{...}}}}
You will then receive the tool result and may call another tool.
When you are ready to answer the patient, reply with plain text (no JSON)."#
    )
}

pub const INFORMATION_ROLE: &str =
    "You are an assistant that answers FAQs or doctor availability queries.";

pub const BOOKING_ROLE: &str =
    "You manage appointments: setting, rescheduling, or canceling.";

pub const TOOL_LIMIT_NOTE: &str =
    "Tool limit reached. Answer the patient now in plain text using the results above.";
