//! Single-pass unit traversal
//!
//! One iterative depth-first walk per unit. Each node gets its pre-order
//! callbacks (kind, then name-keyed, then annotation usages) and, after its
//! children, its post-order callbacks. Detectors are always invoked in
//! registration order, and a failing detector is disabled for the rest of
//! the unit.

use super::context::{DetectorContext, UnitEnv, UnitState};
use super::{AnnotationUsage, Detector, DetectorFailure, DispatchTable, Finding, UsageKind};
use crate::evaluator::MethodRef;
use crate::issues::LINT_ERROR;
use crate::model::{AnnotationInstance, NodeId, NodeKind};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

pub(crate) struct UnitVisitor<'v> {
    env: &'v UnitEnv<'v>,
    table: &'v DispatchTable,
    active: &'v [bool],
    state: UnitState,
}

impl<'v> UnitVisitor<'v> {
    pub(crate) fn new(env: &'v UnitEnv<'v>, active: &'v [bool]) -> Self {
        let table = env.registration.table(env.tree.phase());
        Self {
            env,
            table,
            active,
            state: UnitState::new(env.registration.len()),
        }
    }

    /// Walk the unit and return what the detectors produced
    pub(crate) fn run(mut self) -> UnitState {
        let table = self.table;
        let tree = self.env.tree;
        let participants: Vec<usize> = table
            .participants()
            .iter()
            .copied()
            .filter(|&d| self.active[d])
            .collect();
        if participants.is_empty() {
            return self.state;
        }

        for &d in &participants {
            self.invoke(d, |detector, ctx| detector.before_unit(ctx));
        }

        let root = tree.root();
        let mut stack = vec![(root, false)];
        while let Some((node, exiting)) = stack.pop() {
            if exiting {
                self.exit(node);
                continue;
            }
            if tree.parent(node) == Some(root) && self.env.cancel.is_cancelled() {
                debug!("Cancelled while visiting {}", tree.file().display());
                self.state.cancelled = true;
                return self.state;
            }
            self.enter(node);
            stack.push((node, true));
            stack.extend(tree.children(node).iter().rev().map(|&c| (c, false)));
        }

        for &d in &participants {
            self.invoke(d, |detector, ctx| detector.after_unit(ctx));
        }
        self.state
    }

    fn enter(&mut self, node: NodeId) {
        let table = self.table;
        let tree = self.env.tree;
        let kind = tree.node_kind(node);

        for &d in table.on_enter(kind) {
            self.invoke(d, |detector, ctx| detector.on_enter(ctx, node));
        }

        match kind {
            NodeKind::Call => self.enter_call(node),
            NodeKind::New => self.enter_new(node),
            NodeKind::Annotation => self.enter_annotation(node),
            NodeKind::Field | NodeKind::LocalVariable => self.enter_variable(node),
            NodeKind::Element => {
                if let Some(tag) = tree.name(node) {
                    for &d in table.named(NodeKind::Element, tag) {
                        self.invoke(d, |detector, ctx| detector.on_xml_element(ctx, node));
                    }
                }
            }
            NodeKind::Attribute => {
                if let Some(name) = tree.name(node) {
                    for &d in table.named(NodeKind::Attribute, name) {
                        self.invoke(d, |detector, ctx| detector.on_xml_attribute(ctx, node));
                    }
                }
            }
            _ => {}
        }
    }

    fn exit(&mut self, node: NodeId) {
        let table = self.table;
        for &d in table.on_exit(self.env.tree.node_kind(node)) {
            self.invoke(d, |detector, ctx| detector.on_exit(ctx, node));
        }
    }

    fn wants_annotations(&self) -> bool {
        self.table.has_named(NodeKind::Annotation)
    }

    fn enter_call(&mut self, call: NodeId) {
        let table = self.table;
        let env = self.env;
        let by_name = env
            .tree
            .name(call)
            .map_or(&[][..], |name| table.named(NodeKind::Call, name));
        if by_name.is_empty() && !self.wants_annotations() {
            return;
        }
        let Some(method) = env.evaluator.resolve_call(call) else {
            return;
        };

        for &d in by_name {
            self.invoke(d, |detector, ctx| detector.on_method_call(ctx, call, &method));
        }
        if self.wants_annotations() {
            self.dispatch_call_annotations(call, &method);
        }
    }

    fn enter_new(&mut self, node: NodeId) {
        let table = self.table;
        let env = self.env;
        let Some(written) = env.tree.node(node).type_name.as_deref() else {
            return;
        };
        let class = env
            .evaluator
            .qualify_type(written, node)
            .unwrap_or_else(|| written.to_string());

        for &d in table.named(NodeKind::New, &class) {
            self.invoke(d, |detector, ctx| detector.on_constructor_call(ctx, node, &class));
        }

        if !self.wants_annotations() {
            return;
        }
        // Constructors are indexed under the simple class name
        let simple = class.rsplit('.').next().unwrap_or(&class);
        let arity = env.tree.arguments(node).len();
        if let Some((owner, symbol)) = env
            .evaluator
            .symbols()
            .find_method(&class, simple, arity)
            .filter(|(_, m)| m.is_constructor())
        {
            let method = MethodRef {
                name: simple.to_string(),
                arity,
                receiver: Some(class.clone()),
                owner: Some(owner.name.clone()),
                symbol: Some(symbol),
            };
            self.dispatch_argument_annotations(node, &method);
        }
    }

    /// Method-level and parameter-level annotations of a resolved call
    fn dispatch_call_annotations(&mut self, call: NodeId, method: &MethodRef<'_>) {
        if method.symbol.is_none() {
            return;
        }
        let annotations = self.env.evaluator.method_annotations(method);
        for annotation in &annotations {
            let usage = AnnotationUsage {
                annotation,
                kind: UsageKind::MethodCall,
                node: call,
                method: Some(method),
            };
            self.dispatch_usage(&usage);
        }
        self.dispatch_argument_annotations(call, method);
    }

    fn dispatch_argument_annotations(&mut self, call: NodeId, method: &MethodRef<'_>) {
        let arguments = self.env.tree.arguments(call);
        for (index, argument) in arguments.into_iter().enumerate() {
            let annotations = self.env.evaluator.parameter_annotations(method, index);
            for annotation in &annotations {
                let usage = AnnotationUsage {
                    annotation,
                    kind: UsageKind::Argument { index },
                    node: argument,
                    method: Some(method),
                };
                self.dispatch_usage(&usage);
            }
        }
    }

    /// The annotation as written; meta-annotations are not expanded here
    fn enter_annotation(&mut self, node: NodeId) {
        if !self.wants_annotations() {
            return;
        }
        let env = self.env;
        let context = env.evaluator.class_name_of(node);
        let mut annotation = AnnotationInstance::from_node(env.tree, node, context);
        if let Some(qualified) = env.evaluator.qualify_type(&annotation.name, node) {
            annotation.name = qualified;
        }
        let usage = AnnotationUsage {
            annotation: &annotation,
            kind: UsageKind::Definition,
            node,
            method: None,
        };
        self.dispatch_usage(&usage);
    }

    fn enter_variable(&mut self, node: NodeId) {
        if !self.wants_annotations() {
            return;
        }
        let env = self.env;
        let Some(initializer) = env.tree.initializer(node) else {
            return;
        };
        if env.tree.annotations(node).next().is_none() {
            return;
        }
        let annotations = env.evaluator.node_annotations(node);
        for annotation in &annotations {
            let usage = AnnotationUsage {
                annotation,
                kind: UsageKind::Initializer,
                node: initializer,
                method: None,
            };
            self.dispatch_usage(&usage);
        }
    }

    fn dispatch_usage(&mut self, usage: &AnnotationUsage<'_>) {
        for d in self.table.annotation(&usage.annotation.name) {
            self.invoke(d, |detector, ctx| detector.on_annotation(ctx, usage));
        }
    }

    /// Run one callback with failure containment
    fn invoke<F>(&mut self, index: usize, callback: F)
    where
        F: FnOnce(&dyn Detector, &mut DetectorContext<'_>) -> anyhow::Result<()>,
    {
        if !self.active[index] || self.state.disabled[index] {
            return;
        }
        let detector = self.env.registration.detector(index);
        let outcome = {
            let mut ctx = DetectorContext::new(self.env, &mut self.state, index);
            panic::catch_unwind(AssertUnwindSafe(|| callback(detector, &mut ctx)))
        };
        let message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => format!("{:#}", err),
            Err(payload) => panic_message(payload.as_ref()),
        };
        self.fail(index, message);
    }

    fn fail(&mut self, index: usize, message: String) {
        let env = self.env;
        let name = env.registration.detector(index).name();
        let file = env.tree.file();
        warn!("Detector {} failed on {}: {}", name, file.display(), message);

        self.state.disabled[index] = true;
        self.state.failures.push(DetectorFailure {
            detector: name,
            file: file.to_path_buf(),
            message: message.clone(),
        });

        if env.registry.contains(&LINT_ERROR) {
            let finding = Finding::new(
                &LINT_ERROR,
                env.tree.source_location(env.tree.root()),
                format!(
                    "Unexpected failure during lint analysis (detector `{}`): {}",
                    name, message
                ),
            );
            self.state.commit(env, finding);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
