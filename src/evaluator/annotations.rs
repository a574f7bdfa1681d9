//! Annotation queries
//!
//! Declared annotations come first, then the merged meta-annotations of any
//! annotation-typed carrier (for example a custom `@Mode` annotated with
//! `@IntDef`). When a relevant-name set is installed, only names detectors
//! registered for survive, and `java.`/`kotlin.` annotations are not merged.

use super::{Evaluator, MethodRef};
use crate::model::{AnnotationInstance, Declaration, NodeId};

impl<'a> Evaluator<'a> {
    /// Annotations visible on a declaration
    ///
    /// With `include_inherited`, annotations on overridden methods,
    /// their parameters and superclasses are appended after the declared
    /// ones.
    pub fn all_annotations(
        &self,
        declaration: &Declaration,
        include_inherited: bool,
    ) -> Vec<AnnotationInstance> {
        let mut annotations = self.declared_annotations(declaration);
        if include_inherited {
            annotations.extend(self.inherited_annotations(declaration));
        }
        self.merge_and_filter(annotations)
    }

    /// Annotations on a declaration node of the current unit
    pub fn node_annotations(&self, node: NodeId) -> Vec<AnnotationInstance> {
        self.merge_and_filter(self.annotations_on_node(node))
    }

    pub fn method_annotations(&self, method: &MethodRef<'_>) -> Vec<AnnotationInstance> {
        match method.declaration() {
            Some(declaration) => self.all_annotations(&declaration, true),
            None => Vec::new(),
        }
    }

    /// Annotations on the parameter receiving argument `index`
    pub fn parameter_annotations(&self, method: &MethodRef<'_>, index: usize) -> Vec<AnnotationInstance> {
        let (Some(owner), Some(symbol)) = (&method.owner, method.symbol) else {
            return Vec::new();
        };
        if symbol.parameters.is_empty() {
            return Vec::new();
        }
        // Varargs arguments all bind to the last parameter
        let index = index.min(symbol.parameters.len() - 1);
        let declaration = Declaration::Parameter {
            owner: owner.clone(),
            method: method.name.clone(),
            arity: symbol.arity(),
            index,
        };
        self.all_annotations(&declaration, true)
    }

    fn annotations_on_node(&self, node: NodeId) -> Vec<AnnotationInstance> {
        let tree = self.tree();
        let context = self.class_name_of(node);
        tree.annotations(node)
            .map(|a| {
                let mut annotation = AnnotationInstance::from_node(tree, a, context.clone());
                if let Some(qualified) = self.qualify_type(&annotation.name, a) {
                    annotation.name = qualified;
                }
                annotation
            })
            .collect()
    }

    /// Annotations written on the declaration itself, unmerged and unfiltered
    pub fn declared_annotations(&self, declaration: &Declaration) -> Vec<AnnotationInstance> {
        let symbols = self.symbols();
        match declaration {
            Declaration::Local(node) => self.annotations_on_node(*node),
            Declaration::Class(name) => symbols
                .class(name)
                .map(|c| c.annotations.clone())
                .unwrap_or_default(),
            Declaration::Field { owner, name } => symbols
                .find_field(owner, name)
                .map(|(_, f)| f.annotations.clone())
                .unwrap_or_default(),
            Declaration::Method { owner, name, arity } => symbols
                .find_method(owner, name, *arity)
                .map(|(_, m)| m.annotations.clone())
                .unwrap_or_default(),
            Declaration::Parameter {
                owner,
                method,
                arity,
                index,
            } => symbols
                .find_method(owner, method, *arity)
                .and_then(|(_, m)| m.parameters.get(*index))
                .map(|p| p.annotations.clone())
                .unwrap_or_default(),
        }
    }

    fn inherited_annotations(&self, declaration: &Declaration) -> Vec<AnnotationInstance> {
        let symbols = self.symbols();
        match declaration {
            Declaration::Class(name) => symbols
                .hierarchy(name)
                .into_iter()
                .skip(1)
                .flat_map(|c| c.annotations.iter().cloned())
                .collect(),
            Declaration::Method { owner, name, arity } => symbols
                .overridden_methods(owner, name, *arity)
                .into_iter()
                .flat_map(|m| m.annotations.iter().cloned())
                .collect(),
            Declaration::Parameter {
                owner,
                method,
                arity,
                index,
            } => symbols
                .overridden_methods(owner, method, *arity)
                .into_iter()
                .filter_map(|m| m.parameters.get(*index))
                .flat_map(|p| p.annotations.iter().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn merge_and_filter(&self, declared: Vec<AnnotationInstance>) -> Vec<AnnotationInstance> {
        let mut out: Vec<AnnotationInstance> = Vec::with_capacity(declared.len());
        for annotation in declared {
            let platform = annotation.name.starts_with("java.") || annotation.name.starts_with("kotlin.");
            let merged = if !platform && self.symbols().is_annotation_type(&annotation.name) {
                Some(self.symbols().merged_annotations(&annotation.name))
            } else {
                None
            };
            let relevant_meta: Vec<&AnnotationInstance> = merged
                .iter()
                .flat_map(|m| m.iter())
                .filter(|m| self.is_relevant(&m.name))
                .collect();

            let keep = self.is_relevant(&annotation.name) || !relevant_meta.is_empty();
            if keep && !out.iter().any(|o| o.name == annotation.name) {
                out.push(annotation.clone());
            }
            for meta in relevant_meta {
                if !out.iter().any(|o| o.name == meta.name) {
                    out.push(meta.clone());
                }
            }
        }
        out
    }

    fn is_relevant(&self, name: &str) -> bool {
        match self.relevant {
            None => true,
            Some(relevant) => {
                relevant.contains(name)
                    || (!name.contains('.')
                        && relevant
                            .iter()
                            .any(|r| r.rsplit('.').next() == Some(name)))
            }
        }
    }
}
