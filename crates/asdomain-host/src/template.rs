//! Tera-backed template renderer

use asdomain_converge::{ConvergeError, Result, TemplateRenderer};
use asdomain_core::{CoreError, InstallSettings, TemplateProcessor};

pub struct TeraRenderer {
    processor: TemplateProcessor,
}

impl TeraRenderer {
    /// Built-in templates plus any found in the install's `templates_dir`.
    pub fn new(install: &InstallSettings) -> Result<Self> {
        let mut processor = TemplateProcessor::new()?;
        if let Some(dir) = &install.templates_dir {
            let count = processor.add_template_dir(dir)?;
            tracing::debug!(dir = %dir.display(), count, "Loaded extra templates");
        }
        Ok(Self { processor })
    }
}

impl TemplateRenderer for TeraRenderer {
    fn has_template(&self, name: &str) -> bool {
        self.processor.has_template(name)
    }

    fn render(&self, name: &str, variables: &serde_json::Value) -> Result<String> {
        self.processor
            .render(name, variables)
            .map_err(|e| match e {
                CoreError::TemplateError { name, message } => {
                    ConvergeError::Template { name, message }
                }
                other => ConvergeError::Config(other),
            })
    }
}
