//! Content plan generation.

mod parse;
mod planner;
mod prompt;
mod types;

pub use parse::{default_visual_prompt, extract_json_object, normalize_plan};
pub use planner::{GeminiPlanner, GeminiPlannerBuilder, PlanGenerator};
pub use prompt::build_plan_prompt;
pub use types::{ContentPlan, GroundingUrl, StoryRequest, ANIMATION_FORMAT, CONTENT_FORMATS};
