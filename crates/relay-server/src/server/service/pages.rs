//! Page and acknowledgment templates.

use relay_core::render::Template;

const INDEX: Template = Template::new(include_str!("../../../templates/index.html"));
const SNIPPET: Template = Template::new(include_str!("../../../templates/snippet.html"));

pub fn index() -> String {
    INDEX.render(&[])
}

/// Acknowledgment fragment returned by `POST /`.
pub fn acknowledgment(question: &str, id: u64) -> String {
    SNIPPET.render(&[("question", question), ("id", &id.to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledgment_embeds_question_and_id() {
        let html = acknowledgment("You have entered: <b>", 4);
        assert!(html.contains("<p class=\"question\">You have entered: &lt;b&gt;</p>"));
        assert!(html.contains("id=\"answer-4\""));
    }

    #[test]
    fn index_has_submission_form() {
        let html = index();
        assert!(html.contains("name=\"input_text\""));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn index_loads_front_end_and_posts_without_scripts() {
        let html = index();
        assert!(html.contains("<script src=\"/dist/htmx.js\"></script>"));
        assert!(html.contains("src=\"/dist/app.js\""));
        assert!(html.contains("action=\"/\" method=\"post\""));
        assert!(html.contains("id=\"text-input\""));
    }
}
