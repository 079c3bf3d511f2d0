/// Artifacts of one crawled page used to build a redesign prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInputs {
    pub copy: String,
    pub css: String,
    pub html: String,
    pub images: String,
}

/// Builds the page redesign prompt
pub fn build_prompt(page: &PageInputs) -> String {
    format!(
        r#"You are a world-class web designer and copywriter.

Given the following:
- The original website copy:
{copy}

- The original CSS:
{css}

- The original HTML:
{html}

- The image URLs:
{images}

Rebuild this page as a modern, visually appealing, responsive HTML+CSS file.
Maintain the brand's theme, colors, and imagery.
Improve the copy for clarity and engagement.
Output only the complete HTML code (including improved CSS, using the original as a base).
Reference the provided images in the HTML as appropriate.
"#,
        copy = page.copy,
        css = page.css,
        html = page.html,
        images = page.images,
    )
}
