//! Fixed prompt texts. Edited as files under `templates/prompts/`.

pub const SYSTEM_PROMPT: &str = include_str!("../../../../templates/prompts/system.txt");

pub const EXAMPLE_1_REQUEST: &str =
    include_str!("../../../../templates/prompts/example_1_request.txt");
pub const EXAMPLE_1_RESPONSE: &str =
    include_str!("../../../../templates/prompts/example_1_response.txt");
pub const EXAMPLE_2_REQUEST: &str =
    include_str!("../../../../templates/prompts/example_2_request.txt");
pub const EXAMPLE_2_RESPONSE: &str =
    include_str!("../../../../templates/prompts/example_2_response.txt");

pub const REVIEW_REQUEST_TEMPLATE_NAME: &str = "review_request.tera";
pub const REVIEW_REQUEST_TEMPLATE: &str =
    include_str!("../../../../templates/prompts/review_request.tera");

pub const REVIEW_REQUEST_PREAMBLE: &str = "Generate a structured case review with the following:";

pub const JUSTIFICATION_PROMPT: &str =
    "Justification [describe how your actions and approach link to the capability]:";

pub const TITLE_SYSTEM_PROMPT: &str = "You are a medical assistant that generates brief (4-6 words) clinical case titles. Make them professional and medical in nature.";

pub const TITLE_REQUEST_PREFIX: &str = "Generate a brief clinical case title from this description:";

pub const IMPROVE_SYSTEM_PROMPT: &str = "You are an AI assistant helping to improve GP portfolio entries.\nIMPORTANT: Only modify the specific aspects mentioned in the improvement request.\nKeep all other content exactly the same.";

pub const IMPROVE_REMINDER: &str = "IMPORTANT: Only modify content specifically related to the requested improvement.\nKeep all other content exactly the same.";
