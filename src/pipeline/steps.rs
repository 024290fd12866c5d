//! Step definition registry.
//!
//! Turns the fixed table in [`crate::prompts::STEP_TEMPLATES`] plus one
//! document's text into the ordered [`StepDefinition`] list a run executes.
//! Length, order, names and roles never depend on the document; only the
//! instruction text does.
//!
//! Later steps mention the output paths of earlier ones. That dependency is
//! textual: the registry does not check that those files exist.

use crate::config::OutputLayout;
use crate::engine::Capability;
use crate::prompts::{StepTemplate, AUXILIARY_FILE_RULE, STEP_TEMPLATES};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The logical role a step is executed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Analysis phase: goals, objectives, feasibility, resources.
    Analyst,
    /// Discovery phase: external resources, datasets, repositories, papers, trends.
    Researcher,
    /// Generation phase: architecture, scaffolding, components, integrations, tests.
    Generator,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Analyst => "Project Analyst",
            Role::Researcher => "Resource Search Specialist",
            Role::Generator => "Senior Full-Stack Developer & Code Architect",
        }
    }

    /// Capabilities a step of this role is intended to use.
    ///
    /// Declarative only; the engine decides what it actually grants.
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Analyst => &[Capability::FileWriter, Capability::WebSearch],
            Role::Researcher => &[
                Capability::FileWriter,
                Capability::WebSearch,
                Capability::CodeSearch,
                Capability::LinkSearch,
                Capability::ScienceSearch,
            ],
            Role::Generator => &[Capability::FileWriter],
        }
    }

    /// The output directory steps of this role write to.
    pub fn output_dir(self, layout: &OutputLayout) -> &Path {
        match self {
            Role::Analyst => &layout.analysis_dir,
            Role::Researcher => &layout.discovery_dir,
            Role::Generator => &layout.generation_dir,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One named unit of work handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique within a run.
    pub name: String,
    pub role: Role,
    pub instructions: String,
    /// Where the step is asked to save its report.
    pub output_path_hint: Option<PathBuf>,
}

/// Number of steps in every run.
pub const STEP_COUNT: usize = STEP_TEMPLATES.len();

/// The role sequence every run follows.
pub fn role_sequence() -> Vec<Role> {
    STEP_TEMPLATES.iter().map(|t| t.role).collect()
}

/// Build the ordered step list for one document.
pub fn build_steps(full_text: &str, layout: &OutputLayout, min_findings: usize) -> Vec<StepDefinition> {
    STEP_TEMPLATES
        .iter()
        .map(|t| StepDefinition {
            name: t.name.to_string(),
            role: t.role,
            instructions: render_instructions(t, full_text, layout, min_findings),
            output_path_hint: Some(output_path(t, layout)),
        })
        .collect()
}

fn output_path(t: &StepTemplate, layout: &OutputLayout) -> PathBuf {
    t.role.output_dir(layout).join(t.file_name)
}

fn render_instructions(
    t: &StepTemplate,
    full_text: &str,
    layout: &OutputLayout,
    min_findings: usize,
) -> String {
    let mut out = String::with_capacity(full_text.len() + 1024);
    out.push_str(t.brief);
    out.push_str("\n\n");

    match t.role {
        Role::Analyst => out.push_str(
            "Ground every statement in the literal project document below and check it \
             against an external knowledge lookup where one is available.\n",
        ),
        Role::Researcher => out.push_str(&format!(
            "Collect at least {min_findings} distinct findings, numbered, each with a \
             source link. Ground the search in the project document below.\n"
        )),
        Role::Generator => {
            out.push_str("Base the work on the project document below.\n\n");
            out.push_str(AUXILIARY_FILE_RULE);
            out.push('\n');
        }
    }

    let refs: Vec<String> = t
        .references
        .iter()
        .filter_map(|r| STEP_TEMPLATES.iter().find(|o| o.name == *r))
        .map(|o| format!("- {}", output_path(o, layout).display()))
        .collect();
    if !refs.is_empty() {
        out.push_str("\nBuild on the reports saved by earlier steps:\n");
        out.push_str(&refs.join("\n"));
        out.push('\n');
    }

    out.push_str(&format!(
        "\nCRITICAL: Save your final answer as Markdown to '{}'.\n\n",
        output_path(t, layout).display()
    ));
    out.push_str("Project Document Content:\n");
    out.push_str(full_text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_is_independent_of_input() {
        let layout = OutputLayout::default();
        let a = build_steps("", &layout, 10);
        let b = build_steps(&"lorem ipsum {} %s \n".repeat(500), &layout, 10);
        assert_eq!(a.len(), STEP_COUNT);
        assert_eq!(b.len(), STEP_COUNT);
        let roles_a: Vec<_> = a.iter().map(|s| s.role).collect();
        let roles_b: Vec<_> = b.iter().map(|s| s.role).collect();
        assert_eq!(roles_a, roles_b);
        assert_eq!(roles_a, role_sequence());
        let names_a: Vec<_> = a.iter().map(|s| &s.name).collect();
        let names_b: Vec<_> = b.iter().map(|s| &s.name).collect();
        assert_eq!(names_a, names_b);
    }

    #[test]
    fn phases_have_expected_sizes() {
        let roles = role_sequence();
        assert_eq!(roles.iter().filter(|r| **r == Role::Analyst).count(), 4);
        assert_eq!(roles.iter().filter(|r| **r == Role::Researcher).count(), 5);
        assert_eq!(roles.iter().filter(|r| **r == Role::Generator).count(), 5);
    }

    #[test]
    fn instructions_embed_document_text() {
        let steps = build_steps("UNIQUE-MARKER-42", &OutputLayout::default(), 10);
        assert!(steps.iter().all(|s| s.instructions.contains("UNIQUE-MARKER-42")));
    }

    #[test]
    fn outputs_land_in_role_directories() {
        let layout = OutputLayout::under("/work");
        for step in build_steps("x", &layout, 10) {
            let hint = step.output_path_hint.unwrap();
            assert!(hint.starts_with(step.role.output_dir(&layout)), "{}", hint.display());
            assert_eq!(hint.extension().unwrap(), "md");
            assert!(step.instructions.contains(&hint.display().to_string()));
        }
    }

    #[test]
    fn discovery_steps_require_min_findings() {
        let steps = build_steps("x", &OutputLayout::default(), 12);
        for s in steps.iter().filter(|s| s.role == Role::Researcher) {
            assert!(s.instructions.contains("at least 12 distinct findings"), "{}", s.name);
        }
    }

    #[test]
    fn later_steps_reference_earlier_outputs() {
        let layout = OutputLayout::default();
        let steps = build_steps("x", &layout, 10);
        let arch = steps.iter().find(|s| s.name == "architecture_design").unwrap();
        assert!(arch
            .instructions
            .contains(&layout.discovery_dir.join("resource_discovery.md").display().to_string()));
        let first = &steps[0];
        assert!(!first.instructions.contains("Build on the reports"));
    }

    #[test]
    fn generation_steps_describe_auxiliary_files() {
        let steps = build_steps("x", &OutputLayout::default(), 10);
        for s in &steps {
            assert_eq!(
                s.instructions.contains("<!-- file: "),
                s.role == Role::Generator,
                "{}",
                s.name
            );
        }
    }

    #[test]
    fn roles_declare_file_writer() {
        for role in [Role::Analyst, Role::Researcher, Role::Generator] {
            assert!(role.capabilities().contains(&Capability::FileWriter));
        }
        assert!(!Role::Generator.capabilities().contains(&Capability::WebSearch));
    }
}
