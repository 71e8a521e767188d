//! Conversion orchestration.
//!
//! Drives `parsing → routing → generating` per section, then a single
//! `validating` pass over the assembled document. Progress is reported
//! through a caller-supplied callback; cancellation is cooperative and
//! checked at section boundaries only, so in-flight work for the
//! current section always runs to completion. A cancelled run returns
//! whatever sections finished, explicitly marked as cancelled.

use crate::graph::{self, IdGen};
use crate::parser::weave_html;
use crate::schema::{self, ClipDocument, ClipIx2, ClipMeta, ClipNode, ClipPayload, ClipStyle};
use crate::style::dedupe::{ClassRegistry, DuplicateFilter};
use crate::style::minify;
use crate::style::router::{self, StyleClass};
use crate::style::variables::VariableTable;
use crate::style::weave_css;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// One independently processed unit of input.
#[derive(Debug, Clone)]
pub struct SectionInput {
    pub label: String,
    pub html: String,
    pub css: String,
}

/// A whole conversion request. JavaScript, when present, is preserved
/// verbatim through the embed escape hatch.
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    pub sections: Vec<SectionInput>,
    pub js: Option<String>,
}

impl ConvertRequest {
    /// Single-section request, the common case.
    pub fn single(html: impl Into<String>, css: impl Into<String>) -> Self {
        ConvertRequest {
            sections: vec![SectionInput {
                label: "section-1".to_string(),
                html: html.into(),
                css: css.into(),
            }],
            js: None,
        }
    }
}

/// Pipeline phases, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Parsing,
    Routing,
    Generating,
    Validating,
    Complete,
    Cancelled,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Parsing => "parsing",
            Phase::Routing => "routing",
            Phase::Generating => "generating",
            Phase::Validating => "validating",
            Phase::Complete => "complete",
            Phase::Cancelled => "cancelled",
        }
    }
}

/// Emitted at every phase transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub percentage: u8,
    pub current_item: String,
}

/// Cooperative cancellation handle. Cloneable; any clone can cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Structurally unrecoverable failures. Everything else degrades to
/// warnings or section errors.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input contains no HTML and no CSS")]
    EmptyInput,
    #[error("assembled document failed validation: {0:?}")]
    Validation(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStatus {
    Complete,
    Cancelled,
}

/// A failure scoped to one section; later sections still run.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionError {
    pub section: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SizeStats {
    pub input_bytes: usize,
    pub output_bytes: usize,
    pub node_count: usize,
    pub style_count: usize,
    pub embed_count: usize,
}

/// Owned by the orchestrator until returned; immutable afterwards.
#[derive(Debug)]
pub struct ConversionResult {
    pub document: ClipDocument,
    pub status: ConversionStatus,
    pub warnings: Vec<String>,
    pub errors: Vec<SectionError>,
    pub size_stats: SizeStats,
    /// Sections that ran to completion (cancelled runs stop early).
    pub completed_sections: usize,
}

/// Convert with no progress reporting and no cancellation.
pub fn convert_simple<R: ClassRegistry>(
    request: &ConvertRequest,
    registry: &R,
) -> Result<ConversionResult, ConvertError> {
    convert(request, registry, &CancelToken::new(), &mut |_| {})
}

/// Run the full pipeline.
pub fn convert<R, F>(
    request: &ConvertRequest,
    registry: &R,
    cancel: &CancelToken,
    progress: &mut F,
) -> Result<ConversionResult, ConvertError>
where
    R: ClassRegistry,
    F: FnMut(ProgressEvent),
{
    let has_input = request
        .sections
        .iter()
        .any(|s| !s.html.trim().is_empty() || !s.css.trim().is_empty());
    if !has_input {
        return Err(ConvertError::EmptyInput);
    }

    let existing = match registry.existing_class_names() {
        Ok(names) => names,
        Err(err) => {
            // The lookup is the only external dependency; degrade to
            // an empty set so duplicate filtering becomes a no-op.
            warn!("class registry lookup failed: {}", err);
            HashSet::new()
        }
    };

    let mut run = Run {
        ids: IdGen::new(),
        filter: DuplicateFilter::new(existing),
        nodes: Vec::new(),
        styles: Vec::new(),
        embed_texts: Vec::new(),
        warnings: Vec::new(),
        errors: Vec::new(),
        omitted_classes: HashSet::new(),
    };

    let total = request.sections.len();
    let mut status = ConversionStatus::Complete;
    let mut completed = 0usize;

    for (index, section) in request.sections.iter().enumerate() {
        // Cancellation takes effect before the next section begins.
        if cancel.is_cancelled() {
            status = ConversionStatus::Cancelled;
            break;
        }
        let base = section_percentage(index, total);
        match run.process_section(section, base, progress) {
            Ok(()) => completed += 1,
            Err(message) => {
                debug!("section {} failed: {}", section.label, message);
                run.errors.push(SectionError {
                    section: section.label.clone(),
                    message,
                });
            }
        }
    }

    if let Some(js) = request.js.as_deref() {
        if !js.trim().is_empty() {
            let id = run.ids.next_node();
            run.nodes
                .push(ClipNode::html_embed(id, format!("<script>{}</script>", js.trim())));
        }
    }

    // Everything embed-routed is concatenated, minified once, and
    // carried by a single synthetic HtmlEmbed node.
    if !run.embed_texts.is_empty() {
        let combined = run.embed_texts.join("\n");
        let minified = minify::minify(&combined);
        let id = run.ids.next_node();
        run.nodes
            .push(ClipNode::html_embed(id, format!("<style>{}</style>", minified)));
    }

    let document = ClipDocument {
        doc_type: schema::FORMAT_MARKER.to_string(),
        payload: ClipPayload {
            nodes: run.nodes,
            styles: run.styles,
            assets: Vec::new(),
            ix1: Vec::new(),
            ix2: ClipIx2::default(),
        },
        meta: ClipMeta::default(),
    };

    progress(ProgressEvent {
        phase: Phase::Validating,
        percentage: 95,
        current_item: "document".to_string(),
    });
    if let Err(violations) = schema::validate(&document, &run.omitted_classes) {
        match status {
            // A partial document is reported, not rejected.
            ConversionStatus::Cancelled => {
                for v in violations {
                    run.warnings.push(format!("partial document: {}", v));
                }
            }
            ConversionStatus::Complete => return Err(ConvertError::Validation(violations)),
        }
    }

    let terminal = match status {
        ConversionStatus::Complete => Phase::Complete,
        ConversionStatus::Cancelled => Phase::Cancelled,
    };
    progress(ProgressEvent {
        phase: terminal,
        percentage: 100,
        current_item: String::new(),
    });

    let input_bytes: usize = request
        .sections
        .iter()
        .map(|s| s.html.len() + s.css.len())
        .sum::<usize>()
        + request.js.as_deref().map(str::len).unwrap_or(0);
    let output_bytes = serde_json::to_vec(&document).map(|v| v.len()).unwrap_or(0);
    let embed_count = document
        .payload
        .nodes
        .iter()
        .filter(|n| n.node_type == "HtmlEmbed")
        .count();
    let size_stats = SizeStats {
        input_bytes,
        output_bytes,
        node_count: document.payload.nodes.len(),
        style_count: document.payload.styles.len(),
        embed_count,
    };

    Ok(ConversionResult {
        document,
        status,
        warnings: run.warnings,
        errors: run.errors,
        size_stats,
        completed_sections: completed,
    })
}

/// Mutable state threaded through one conversion run. Nothing here is
/// shared across runs, so concurrent conversions need no coordination.
struct Run {
    ids: IdGen,
    filter: DuplicateFilter,
    nodes: Vec<ClipNode>,
    styles: Vec<ClipStyle>,
    embed_texts: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<SectionError>,
    omitted_classes: HashSet<String>,
}

impl Run {
    fn process_section<F>(
        &mut self,
        section: &SectionInput,
        base_pct: u8,
        progress: &mut F,
    ) -> Result<(), String>
    where
        F: FnMut(ProgressEvent),
    {
        if section.html.trim().is_empty() && section.css.trim().is_empty() {
            return Err("section has no HTML and no CSS".to_string());
        }

        progress(ProgressEvent {
            phase: Phase::Parsing,
            percentage: base_pct,
            current_item: section.label.clone(),
        });

        let (document, parse_errors) = weave_html::create_dom_tree(&section.html);
        for err in parse_errors {
            self.warnings
                .push(format!("html parse ({}): {}", section.label, err));
        }

        let built = graph::build_graph(&document, &mut self.ids);
        self.warnings.extend(built.warnings);

        // Inline <style> blocks join the section's own CSS.
        let mut css_text = section.css.clone();
        for inline in &built.inline_css {
            css_text.push('\n');
            css_text.push_str(inline);
        }
        let parsed = weave_css::parse_css(&css_text)
            .map_err(|e| format!("css parse failed: {}", e))?;
        for w in parsed.warnings {
            self.warnings.push(format!("{} ({})", w, section.label));
        }

        progress(ProgressEvent {
            phase: Phase::Routing,
            percentage: base_pct.saturating_add(3),
            current_item: section.label.clone(),
        });

        let table = VariableTable::from_rules(&parsed.sheet.rules);
        let routed = router::route(&parsed.sheet.rules, &parsed.raw_at_rules, &table);
        self.warnings.extend(routed.warnings);

        progress(ProgressEvent {
            phase: Phase::Generating,
            percentage: base_pct.saturating_add(6),
            current_item: section.label.clone(),
        });

        let kept = self.filter.filter(routed.native.clone());
        self.note_omitted(&routed.native, &kept);

        for class in &kept {
            let id = self.ids.next_style();
            self.styles.push(ClipStyle::from_class(id, class));
        }
        for block in &routed.embeds {
            self.embed_texts.push(block.css_text.clone());
        }
        for node in &built.nodes {
            // Classes with no style object anywhere this run are
            // intentional omissions, not violations.
            for class in &node.classes {
                if !routed.native.iter().any(|s| &s.name == class) {
                    self.omitted_classes.insert(class.clone());
                }
            }
            self.nodes.push(ClipNode::from_graph(node));
        }
        for inline_js in &built.inline_js {
            let id = self.ids.next_node();
            self.nodes.push(ClipNode::html_embed(
                id,
                format!("<script>{}</script>", inline_js),
            ));
        }

        Ok(())
    }

    /// Record the names the duplicate filter removed, so the validator
    /// accepts nodes that still reference them.
    fn note_omitted(&mut self, routed: &[StyleClass], kept: &[StyleClass]) {
        for class in routed {
            if !kept.iter().any(|k| k.name == class.name) {
                self.omitted_classes.insert(class.name.clone());
            }
        }
    }
}

fn section_percentage(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((index * 90) / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::dedupe::{EmptyRegistry, StaticRegistry};
    use pretty_assertions::assert_eq;

    #[test]
    fn hero_scenario_end_to_end() {
        let request = ConvertRequest::single(
            "<div class=\"hero\"><h1>Hi</h1></div>",
            ".hero { color: red; }",
        );
        let result = convert_simple(&request, &EmptyRegistry).unwrap();
        assert_eq!(result.status, ConversionStatus::Complete);
        assert_eq!(result.document.payload.nodes.len(), 2);
        assert_eq!(result.document.payload.styles.len(), 1);
        let style = &result.document.payload.styles[0];
        assert_eq!(style.name, "hero");
        assert!(style.style_less.starts_with("color:"));
        let h1 = &result.document.payload.nodes[1];
        assert_eq!(h1.data.text.as_deref(), Some("Hi"));
    }

    #[test]
    fn empty_input_is_fatal() {
        let request = ConvertRequest::single("", "  ");
        let err = convert_simple(&request, &EmptyRegistry).unwrap_err();
        assert!(matches!(err, ConvertError::EmptyInput));
    }

    #[test]
    fn registry_collision_drops_style_but_keeps_node() {
        let request = ConvertRequest::single(
            "<div class=\"hero\">x</div>",
            ".hero { color: red; }",
        );
        let registry = StaticRegistry::new(["hero"]);
        let result = convert_simple(&request, &registry).unwrap();
        assert!(result.document.payload.styles.is_empty());
        assert_eq!(result.document.payload.nodes.len(), 1);
        assert_eq!(result.document.payload.nodes[0].classes, vec!["hero"]);
    }

    #[test]
    fn pseudo_element_lands_in_embed_node() {
        let request = ConvertRequest::single(
            "<div class=\"hero\">x</div>",
            ".hero { color: red; } .hero::before { content: \"*\"; }",
        );
        let result = convert_simple(&request, &EmptyRegistry).unwrap();
        let embed = result
            .document
            .payload
            .nodes
            .iter()
            .find(|n| n.node_type == "HtmlEmbed")
            .expect("embed node");
        let code = &embed.data.embed.as_ref().unwrap().code;
        assert!(code.starts_with("<style>"));
        assert!(code.contains("before"));
        assert!(result
            .document
            .payload
            .styles
            .iter()
            .all(|s| !s.style_less.contains("content")));
    }

    #[test]
    fn cancellation_after_first_section_keeps_partial_result() {
        let sections: Vec<SectionInput> = (1..=3)
            .map(|i| SectionInput {
                label: format!("section-{}", i),
                html: format!("<div class=\"s{}\">x</div>", i),
                css: format!(".s{} {{ margin: 0; }}", i),
            })
            .collect();
        let request = ConvertRequest {
            sections,
            js: None,
        };
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let result = convert(&request, &EmptyRegistry, &cancel, &mut |event| {
            // Request cancellation while section 1 is mid-flight; it
            // takes effect at the next section boundary.
            if event.phase == Phase::Generating && event.current_item == "section-1" {
                trigger.cancel();
            }
        })
        .unwrap();
        assert_eq!(result.status, ConversionStatus::Cancelled);
        assert_eq!(result.completed_sections, 1);
        assert_eq!(result.document.payload.styles.len(), 1);
        assert_eq!(result.document.payload.styles[0].name, "s1");
    }

    #[test]
    fn bad_section_recorded_and_rest_continue() {
        let request = ConvertRequest {
            sections: vec![
                SectionInput {
                    label: "empty".to_string(),
                    html: String::new(),
                    css: String::new(),
                },
                SectionInput {
                    label: "good".to_string(),
                    html: "<p>ok</p>".to_string(),
                    css: String::new(),
                },
            ],
            js: None,
        };
        let result = convert_simple(&request, &EmptyRegistry).unwrap();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].section, "empty");
        assert_eq!(result.completed_sections, 1);
        assert_eq!(result.document.payload.nodes.len(), 1);
    }

    #[test]
    fn js_preserved_via_embed() {
        let mut request = ConvertRequest::single("<div>x</div>", "");
        request.js = Some("console.log('hi')".to_string());
        let result = convert_simple(&request, &EmptyRegistry).unwrap();
        let embed = result
            .document
            .payload
            .nodes
            .iter()
            .find(|n| n.node_type == "HtmlEmbed")
            .expect("script embed");
        assert!(embed.data.embed.as_ref().unwrap().code.contains("console.log"));
    }

    #[test]
    fn progress_phases_in_order() {
        let request = ConvertRequest::single("<p>x</p>", ".a { color: red; }");
        let mut phases = Vec::new();
        convert(&request, &EmptyRegistry, &CancelToken::new(), &mut |e| {
            phases.push(e.phase)
        })
        .unwrap();
        assert_eq!(
            phases,
            vec![
                Phase::Parsing,
                Phase::Routing,
                Phase::Generating,
                Phase::Validating,
                Phase::Complete
            ]
        );
    }

    #[test]
    fn size_stats_populated() {
        let request = ConvertRequest::single("<p>x</p>", ".a{color:red}");
        let result = convert_simple(&request, &EmptyRegistry).unwrap();
        assert!(result.size_stats.input_bytes > 0);
        assert!(result.size_stats.output_bytes > 0);
        assert_eq!(result.size_stats.node_count, 1);
    }
}
