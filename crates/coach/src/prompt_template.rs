use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tera::{Context, Error as TeraError, Tera};

pub use tera::Error as PromptError;

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    tera.render("inline_template", &context)
}

pub fn load_prompt_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_path = template_file.into();
    let template_content = fs::read_to_string(&template_path).map_err(|e| {
        TeraError::chain(
            format!("Failed to read template file {}", template_path.display()),
            e,
        )
    })?;
    load_prompt(&template_content, context_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_load_prompt() {
        let template = "You are {{ name }}. Cite {{ source }}.";
        let mut context = HashMap::new();
        context.insert("name".to_string(), "Coach".to_string());
        context.insert("source".to_string(), "the DOI".to_string());

        let result = load_prompt(template, &context).unwrap();
        assert_eq!(result, "You are Coach. Cite the DOI.");
    }

    #[test]
    fn test_load_prompt_missing_variable() {
        let template = "You are {{ name }}.";
        let context: HashMap<String, String> = HashMap::new();
        assert!(load_prompt(template, &context).is_err());
    }

    #[test]
    fn test_load_prompt_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("custom.md");
        fs::write(&file_path, "Hello from {{ name }}!").unwrap();

        let mut context = HashMap::new();
        context.insert("name".to_string(), "Coach".to_string());

        let result = load_prompt_file(file_path, &context).unwrap();
        assert_eq!(result, "Hello from Coach!");

        temp_dir.close().unwrap();
    }

    #[test]
    fn test_bare_name_is_not_resolved_against_bundled_prompts() {
        let mut context = HashMap::new();
        context.insert("name".to_string(), "Coach".to_string());

        let err = load_prompt_file("system.md", &context).unwrap_err();
        assert!(err.to_string().contains("system.md"));
    }

    #[test]
    fn test_load_prompt_file_missing_file() {
        let context: HashMap<String, String> = HashMap::new();
        let result = load_prompt_file(PathBuf::from("non_existent_template.md"), &context);
        assert!(result.is_err());
    }
}
