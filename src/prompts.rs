//! Prompt text for the step registry and the default engine.
//!
//! Every instruction the engine sees is assembled from the constants and
//! templates in this file, so wording changes happen in exactly one place and
//! unit tests can inspect them without an LLM.

use crate::pipeline::steps::Role;

/// One entry of the fixed step table.
#[derive(Debug, Clone, Copy)]
pub struct StepTemplate {
    /// Unique step name; also the stem of its output file.
    pub name: &'static str,
    pub role: Role,
    /// Output file name inside the role's output directory.
    pub file_name: &'static str,
    /// What the step must produce.
    pub brief: &'static str,
    /// Earlier steps whose saved outputs this step builds on.
    pub references: &'static [&'static str],
}

/// The fixed, ordered step table: four analysis, five discovery and five
/// generation steps. References always point at earlier entries.
pub const STEP_TEMPLATES: [StepTemplate; 14] = [
    // ── Analysis ─────────────────────────────────────────────────────────
    StepTemplate {
        name: "goal_extraction",
        role: Role::Analyst,
        file_name: "project_goals.md",
        brief: "Extract the project's stated goals, target users and success criteria. \
                Structure the report with the sections Summary, Goals, Target Users and \
                Success Criteria, quoting the document wherever a goal is stated explicitly.",
        references: &[],
    },
    StepTemplate {
        name: "objective_breakdown",
        role: Role::Analyst,
        file_name: "objectives_breakdown.md",
        brief: "Break every goal into concrete, measurable objectives and deliverables. \
                For each objective give its owner role, its acceptance criterion and the \
                objectives it depends on.",
        references: &["goal_extraction"],
    },
    StepTemplate {
        name: "feasibility_assessment",
        role: Role::Analyst,
        file_name: "feasibility_assessment.md",
        brief: "Assess technical, operational and market feasibility. Report Risks \
                (each with a severity and a mitigation), Strengths and Opportunities, and \
                compare the project with similar projects you can find.",
        references: &["goal_extraction", "objective_breakdown"],
    },
    StepTemplate {
        name: "resource_estimation",
        role: Role::Analyst,
        file_name: "resource_estimation.md",
        brief: "Estimate the team roles and skills, infrastructure, budget ranges and a \
                phased timeline needed to deliver the objectives.",
        references: &["objective_breakdown", "feasibility_assessment"],
    },
    // ── Discovery ────────────────────────────────────────────────────────
    StepTemplate {
        name: "resource_discovery",
        role: Role::Researcher,
        file_name: "resource_discovery.md",
        brief: "Find tools, libraries, frameworks and APIs that would accelerate the \
                objectives. For each give its name, link, licence and why it fits.",
        references: &["objective_breakdown"],
    },
    StepTemplate {
        name: "dataset_discovery",
        role: Role::Researcher,
        file_name: "datasets.md",
        brief: "Find public datasets relevant to the project (Kaggle, Hugging Face, \
                government and research portals). For each give its name, link, licence, \
                size and intended use.",
        references: &["goal_extraction"],
    },
    StepTemplate {
        name: "repository_discovery",
        role: Role::Researcher,
        file_name: "repositories.md",
        brief: "Find open-source repositories that solve parts of this project. For each \
                give its link, primary language, licence, activity and what can be reused.",
        references: &["objective_breakdown"],
    },
    StepTemplate {
        name: "academic_discovery",
        role: Role::Researcher,
        file_name: "academic_papers.md",
        brief: "Find academic papers and technical reports relevant to the project's hard \
                problems. For each give title, authors, year, link and the key takeaway.",
        references: &["feasibility_assessment"],
    },
    StepTemplate {
        name: "trend_discovery",
        role: Role::Researcher,
        file_name: "industry_trends.md",
        brief: "Identify industry and market trends, competing products and emerging \
                techniques that affect the project. For each give a source link and its \
                impact on the plan.",
        references: &["feasibility_assessment"],
    },
    // ── Generation ───────────────────────────────────────────────────────
    StepTemplate {
        name: "architecture_design",
        role: Role::Generator,
        file_name: "architecture_design.md",
        brief: "Design the system architecture: components and their boundaries, data \
                flow, storage, external integrations and technology choices, citing the \
                discovered resources where they are used. Include a diagram in Mermaid.",
        references: &[
            "objective_breakdown",
            "resource_estimation",
            "resource_discovery",
            "repository_discovery",
        ],
    },
    StepTemplate {
        name: "starter_template",
        role: Role::Generator,
        file_name: "starter_template.md",
        brief: "Generate the starter project skeleton for the architecture: directory \
                tree, build and configuration files, environment template and README.",
        references: &["architecture_design"],
    },
    StepTemplate {
        name: "component_generation",
        role: Role::Generator,
        file_name: "core_components.md",
        brief: "Implement the core components of the architecture as production-ready, \
                modular source files that fit the starter template.",
        references: &["architecture_design", "starter_template"],
    },
    StepTemplate {
        name: "integration_generation",
        role: Role::Generator,
        file_name: "integrations.md",
        brief: "Implement the integrations with the external APIs and datasets the \
                architecture relies on, including configuration and error handling.",
        references: &["architecture_design", "resource_discovery", "dataset_discovery"],
    },
    StepTemplate {
        name: "test_generation",
        role: Role::Generator,
        file_name: "test_suite.md",
        brief: "Write automated tests for the generated components and integrations, \
                plus instructions for running them.",
        references: &["component_generation", "integration_generation"],
    },
];

/// Persona sent as the system prompt for each role.
pub fn role_persona(role: Role) -> &'static str {
    match role {
        Role::Analyst => {
            "You are a skilled project analyst. You read project documents and extract \
             goals, risks, strengths and opportunities, and you check your conclusions \
             against similar projects."
        }
        Role::Researcher => {
            "You are a research librarian for software projects with deep knowledge of \
             developer communities, academic databases and open-source ecosystems. You \
             judge resources on quality, licensing compatibility and relevance."
        }
        Role::Generator => {
            "You are a senior full-stack developer and architect. You produce modular, \
             production-ready code and documentation that follows established practice \
             for the chosen stack."
        }
    }
}

/// Rules shared by every step's system prompt.
pub const OUTPUT_RULES: &str = r#"OUTPUT RULES
- Answer in Markdown only; do not wrap the whole answer in a code fence.
- Do not invent links. Mark anything you could not verify as (unverified).
- Your answer is saved to disk verbatim as the step's report."#;

/// Instruction appended to generation steps describing auxiliary files.
pub const AUXILIARY_FILE_RULE: &str = r#"GENERATED FILES
Emit every generated source or configuration file as a fenced code block directly
preceded by a marker line naming its relative path, for example:

<!-- file: src/main.py -->
```python
print("hello")
```

A file that itself contains fenced code blocks is wrapped in a longer fence
(four backticks) and every inner block carries a language tag.

Paths are relative, use forward slashes and never contain "..". The rest of your
answer is the summary document."#;

/// Build the clause telling a step which lookup providers it may cite.
pub fn lookup_clause(capabilities: &[&str]) -> String {
    if capabilities.is_empty() {
        "No external lookup providers are configured; rely on the document and your own knowledge."
            .to_string()
    } else {
        format!(
            "You may base findings on these lookup providers: {}.",
            capabilities.join(", ")
        )
    }
}

/// Context message carrying an earlier step's saved output.
pub fn prior_output_context(step: &str, path: &str, content: &str) -> String {
    format!(
        "Output of the earlier step '{step}', saved at '{path}':\n\n\"\"\"{content}\"\"\""
    )
}
