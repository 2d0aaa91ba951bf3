// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Normalization of raw annotations into signal passes
//!
//! Both the full-image pass and the crop pass run through the same
//! normalization: one raw annotation in, one [`SignalPass`] out.

use super::annotator::Annotation;
use super::signals::{DetectedObject, Label, SignalPass};

/// Web entities are truncated to this many per pass, highest score first
pub const MAX_WEB_ENTITIES: usize = 12;

/// Normalize one raw annotation into a [`SignalPass`].
///
/// OCR text prefers the full-document annotation and falls back to the
/// first plain-text annotation. Web entities are sorted descending by
/// score before the top [`MAX_WEB_ENTITIES`] are kept.
pub fn signal_pass(annotation: Annotation) -> SignalPass {
    let labels = annotation
        .label_annotations
        .into_iter()
        .filter(|l| !l.description.is_empty())
        .map(|l| Label {
            description: l.description,
            score: l.score.clamp(0.0, 1.0),
        })
        .collect();

    let mut logos: Vec<String> = Vec::new();
    for logo in annotation.logo_annotations {
        if !logo.description.is_empty() && !logos.contains(&logo.description) {
            logos.push(logo.description);
        }
    }

    let objects = annotation
        .localized_object_annotations
        .into_iter()
        .map(|o| {
            let mut bounds = [[0.0f32; 2]; 4];
            for (slot, vertex) in bounds
                .iter_mut()
                .zip(o.bounding_poly.normalized_vertices.iter())
            {
                *slot = [vertex.x.clamp(0.0, 1.0), vertex.y.clamp(0.0, 1.0)];
            }
            DetectedObject {
                name: o.name,
                score: o.score,
                bounds,
            }
        })
        .collect();

    let ocr_text = match annotation.full_text_annotation {
        Some(full) if !full.text.is_empty() => full.text,
        _ => annotation
            .text_annotations
            .first()
            .map(|t| t.description.clone())
            .unwrap_or_default(),
    };

    let (web_entities, best_guess) = match annotation.web_detection {
        Some(web) => {
            let mut entities = web.web_entities;
            entities.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

            let mut top: Vec<String> = Vec::new();
            for entity in entities {
                if entity.description.is_empty() || top.contains(&entity.description) {
                    continue;
                }
                top.push(entity.description);
                if top.len() == MAX_WEB_ENTITIES {
                    break;
                }
            }

            let guess = web
                .best_guess_labels
                .iter()
                .map(|g| g.label.trim())
                .find(|l| !l.is_empty())
                .unwrap_or_default()
                .to_string();

            (top, guess)
        }
        None => (Vec::new(), String::new()),
    };

    SignalPass {
        labels,
        logos,
        objects,
        ocr_text,
        best_guess,
        web_entities,
        face_count: annotation.face_annotations.len() as u32,
        safe_search: annotation.safe_search_annotation.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::annotator::{
        BestGuessLabel, EntityAnnotation, FullTextAnnotation, WebDetection, WebEntity,
    };

    fn entity(description: &str, score: f32) -> WebEntity {
        WebEntity {
            description: description.to_string(),
            score,
        }
    }

    #[test]
    fn test_web_entities_sorted_and_truncated() {
        let mut annotation = Annotation::default();
        let entities: Vec<WebEntity> = (0..15)
            .map(|i| entity(&format!("entity-{}", i), i as f32 * 0.1))
            .collect();
        annotation.web_detection = Some(WebDetection {
            web_entities: entities,
            best_guess_labels: vec![],
        });

        let pass = signal_pass(annotation);
        assert_eq!(pass.web_entities.len(), MAX_WEB_ENTITIES);
        // Highest score first
        assert_eq!(pass.web_entities[0], "entity-14");
        assert_eq!(pass.web_entities[11], "entity-3");
    }

    #[test]
    fn test_ocr_prefers_full_document_text() {
        let mut annotation = Annotation::default();
        annotation.full_text_annotation = Some(FullTextAnnotation {
            text: "full document".to_string(),
        });
        annotation.text_annotations = vec![EntityAnnotation {
            description: "plain".to_string(),
            score: 0.0,
        }];

        assert_eq!(signal_pass(annotation).ocr_text, "full document");
    }

    #[test]
    fn test_ocr_falls_back_to_plain_text() {
        let mut annotation = Annotation::default();
        annotation.text_annotations = vec![
            EntityAnnotation {
                description: "first plain".to_string(),
                score: 0.0,
            },
            EntityAnnotation {
                description: "second".to_string(),
                score: 0.0,
            },
        ];

        assert_eq!(signal_pass(annotation).ocr_text, "first plain");
    }

    #[test]
    fn test_ocr_empty_when_both_absent() {
        assert_eq!(signal_pass(Annotation::default()).ocr_text, "");
    }

    #[test]
    fn test_best_guess_first_nonempty_label() {
        let mut annotation = Annotation::default();
        annotation.web_detection = Some(WebDetection {
            web_entities: vec![],
            best_guess_labels: vec![
                BestGuessLabel {
                    label: "  ".to_string(),
                },
                BestGuessLabel {
                    label: "dyson v8".to_string(),
                },
            ],
        });
        assert_eq!(signal_pass(annotation).best_guess, "dyson v8");
    }

    #[test]
    fn test_logos_deduplicated_exactly() {
        let mut annotation = Annotation::default();
        annotation.logo_annotations = vec![
            EntityAnnotation {
                description: "Dyson".to_string(),
                score: 0.9,
            },
            EntityAnnotation {
                description: "Dyson".to_string(),
                score: 0.7,
            },
            EntityAnnotation {
                description: "dyson".to_string(),
                score: 0.6,
            },
        ];
        // Case-sensitive: "Dyson" and "dyson" are distinct
        assert_eq!(signal_pass(annotation).logos, vec!["Dyson", "dyson"]);
    }

    #[test]
    fn test_face_count_carried_through() {
        let mut annotation = Annotation::default();
        annotation.face_annotations = vec![serde_json::json!({}), serde_json::json!({})];
        assert_eq!(signal_pass(annotation).face_count, 2);
    }

    #[test]
    fn test_label_scores_clamped() {
        let mut annotation = Annotation::default();
        annotation.label_annotations = vec![EntityAnnotation {
            description: "thing".to_string(),
            score: 1.7,
        }];
        assert_eq!(signal_pass(annotation).labels[0].score, 1.0);
    }
}
