//! Fixtures shared by the unit tests.

use crate::engine::{Engine, EngineError, EngineOutput, EngineRequest, StepOutput};
use async_trait::async_trait;
use lopdf::{dictionary, Document, Object, Stream};

/// Build a PDF with one text page per entry.
pub fn make_test_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Writes `# <step name>` to each step's output path; fails at `fail_at`.
pub struct EchoEngine {
    pub fail_at: Option<usize>,
}

#[async_trait]
impl Engine for EchoEngine {
    fn name(&self) -> &str {
        "echo"
    }

    async fn execute(&self, request: EngineRequest<'_>) -> Result<EngineOutput, EngineError> {
        let mut out = EngineOutput::default();
        for (i, step) in request.steps.iter().enumerate() {
            if self.fail_at == Some(i) {
                return Err(EngineError::StepFailed {
                    step: step.name.clone(),
                    detail: "provider returned 500".into(),
                });
            }
            let text = format!("# {}\n", step.name);
            if let Some(path) = &step.output_path_hint {
                std::fs::write(path, &text).map_err(|source| EngineError::Io {
                    path: path.clone(),
                    source,
                })?;
                out.artifacts.push(path.clone());
            }
            out.final_output = text.clone();
            out.step_outputs.push(StepOutput {
                name: step.name.clone(),
                output: text,
                saved_to: step.output_path_hint.clone(),
                files: vec![],
            });
        }
        Ok(out)
    }
}
