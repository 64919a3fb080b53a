//! The hierarchical pass tree and the pass manager that runs it.
//!
//! A pass is either a leaf (wrapping a transformation) or a group of
//! child passes. Sub-passes are addressed with dot-separated instance
//! names; `*` and `?` wildcards match within a name element and a `**`
//! element descends recursively (option paths only). Options freeze when
//! a pass is constructed; the tree structure stays mutable outside
//! `compile`.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use skuld_ir::{Platform, Program};
use skuld_sched::Manager as ResourceManager;

use crate::error::{CompileError, CompileResult};
use crate::options::Options;
use crate::pass::{Construction, Context, Factory, PassDef, Transform};

/// Match a single path element against a pattern with `*`/`?` wildcards.
fn matches_pattern(pattern: &str, name: &str) -> bool {
    fn rec(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => rec(&p[1..], n) || (!n.is_empty() && rec(p, &n[1..])),
            (Some(b'?'), Some(_)) => rec(&p[1..], &n[1..]),
            (Some(pc), Some(nc)) if pc == nc => rec(&p[1..], &n[1..]),
            _ => false,
        }
    }
    rec(pattern.as_bytes(), name.as_bytes())
}

fn validate_instance_name(name: &str) -> CompileResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CompileError::InvalidInstanceName(name.to_string()))
    }
}

/// The default instance name for a pass type: the last dotted segment,
/// lowercased.
fn derive_instance_name(type_name: &str) -> String {
    type_name
        .rsplit('.')
        .next()
        .unwrap_or(type_name)
        .to_ascii_lowercase()
}

enum PassNode {
    /// Type known, payload not yet built.
    Unconstructed,
    /// Constructed leaf.
    Leaf(Transform),
    /// Group of child passes.
    Group {
        passes: Vec<Pass>,
        conditional: bool,
    },
}

/// One node of the pass tree: a leaf transformation or a group.
pub struct Pass {
    type_name: String,
    instance_name: String,
    def: Option<Arc<dyn PassDef>>,
    options: Options,
    platform_transformer: bool,
    node: PassNode,
}

impl Pass {
    /// A generic (typeless) unconditional group.
    fn generic_group(instance_name: String) -> Self {
        let mut options = Options::new();
        options.add_bool("skip", "Bypass this pass.", false);
        Self {
            type_name: String::new(),
            instance_name,
            def: None,
            options,
            platform_transformer: false,
            node: PassNode::Group {
                passes: vec![],
                conditional: false,
            },
        }
    }

    fn from_type(
        factory: &Factory,
        type_name: &str,
        instance_name: String,
        option_pairs: &[(&str, &str)],
    ) -> CompileResult<Self> {
        let mut pass = if type_name.is_empty() {
            Self::generic_group(instance_name)
        } else {
            let def = factory.get(type_name)?;
            let mut options = Options::new();
            options.add_bool("skip", "Bypass this pass.", false);
            def.declare_options(&mut options);
            Self {
                type_name: type_name.to_string(),
                instance_name,
                platform_transformer: def.is_platform_transformer(),
                def: Some(def),
                options,
                node: PassNode::Unconstructed,
            }
        };
        for (name, value) in option_pairs {
            pass.options.set(name, value)?;
        }
        Ok(pass)
    }

    /// The pass's instance name.
    pub fn name(&self) -> &str {
        &self.instance_name
    }

    /// The pass's type name; empty for generic groups.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The pass's option set.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Whether this pass is (currently) a group.
    pub fn is_group(&self) -> bool {
        matches!(self.node, PassNode::Group { .. })
    }

    /// Whether this pass is a conditional group.
    pub fn is_conditional_group(&self) -> bool {
        matches!(
            self.node,
            PassNode::Group {
                conditional: true,
                ..
            }
        )
    }

    fn sub_passes(&self) -> CompileResult<&Vec<Pass>> {
        match &self.node {
            PassNode::Group { passes, .. } => Ok(passes),
            _ => Err(CompileError::NotAGroup(self.instance_name.clone())),
        }
    }

    fn sub_passes_mut(&mut self) -> CompileResult<&mut Vec<Pass>> {
        match &mut self.node {
            PassNode::Group { passes, .. } => Ok(passes),
            _ => Err(CompileError::NotAGroup(self.instance_name.clone())),
        }
    }

    /// Names of the immediate sub-passes.
    pub fn sub_pass_names(&self) -> Vec<String> {
        self.sub_passes()
            .map(|subs| subs.iter().map(|p| p.instance_name.clone()).collect())
            .unwrap_or_default()
    }

    fn child_index(&self, name: &str) -> CompileResult<usize> {
        self.sub_passes()?
            .iter()
            .position(|p| p.instance_name == name)
            .ok_or_else(|| CompileError::UnresolvedPath(name.to_string()))
    }

    /// Resolve an exact dotted path to a descendant.
    pub fn resolve(&self, target: &str) -> CompileResult<&Pass> {
        let mut curr = self;
        for elem in target.split('.') {
            let idx = curr
                .child_index(elem)
                .map_err(|_| CompileError::UnresolvedPath(target.to_string()))?;
            curr = &curr.sub_passes().expect("child_index implies group")[idx];
        }
        Ok(curr)
    }

    /// Resolve an exact dotted path to a descendant, mutably.
    pub fn resolve_mut(&mut self, target: &str) -> CompileResult<&mut Pass> {
        let (parent, idx) = self.resolve_parent_mut(target)?;
        Ok(&mut parent.sub_passes_mut().expect("resolved through group")[idx])
    }

    /// Whether an exact dotted path resolves.
    pub fn does_pass_exist(&self, target: &str) -> bool {
        self.resolve(target).is_ok()
    }

    /// Resolve a dotted path to its parent group and the child's index.
    fn resolve_parent_mut(&mut self, target: &str) -> CompileResult<(&mut Pass, usize)> {
        match target.split_once('.') {
            None => {
                let idx = self
                    .child_index(target)
                    .map_err(|_| CompileError::UnresolvedPath(target.to_string()))?;
                Ok((self, idx))
            }
            Some((head, rest)) => {
                let idx = self
                    .child_index(head)
                    .map_err(|_| CompileError::UnresolvedPath(target.to_string()))?;
                self.sub_passes_mut()?[idx]
                    .resolve_parent_mut(rest)
                    .map_err(|_| CompileError::UnresolvedPath(target.to_string()))
            }
        }
    }

    fn unique_instance_name(&self, wanted: &str) -> String {
        let names = self.sub_pass_names();
        if !names.iter().any(|n| n == wanted) {
            return wanted.to_string();
        }
        let mut i = 1;
        loop {
            let candidate = format!("{wanted}_{i}");
            if !names.iter().any(|n| n == &candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    fn build_sub_pass(
        &self,
        factory: &Factory,
        type_name: &str,
        instance_name: &str,
        options: &[(&str, &str)],
    ) -> CompileResult<Pass> {
        let name = if instance_name.is_empty() {
            let base = if type_name.is_empty() {
                "group".to_string()
            } else {
                derive_instance_name(type_name)
            };
            self.unique_instance_name(&base)
        } else {
            validate_instance_name(instance_name)?;
            if self.sub_pass_names().iter().any(|n| n == instance_name) {
                return Err(CompileError::DuplicateInstanceName(
                    instance_name.to_string(),
                ));
            }
            instance_name.to_string()
        };
        Pass::from_type(factory, type_name, name, options)
    }

    /// Append a sub-pass to this group. An empty type name makes a
    /// generic group; an empty instance name derives one from the type.
    pub fn append_sub_pass(
        &mut self,
        factory: &Factory,
        type_name: &str,
        instance_name: &str,
        options: &[(&str, &str)],
    ) -> CompileResult<&mut Pass> {
        let pass = self.build_sub_pass(factory, type_name, instance_name, options)?;
        let subs = self.sub_passes_mut()?;
        subs.push(pass);
        Ok(subs.last_mut().expect("just pushed"))
    }

    /// Prepend a sub-pass to this group.
    pub fn prefix_sub_pass(
        &mut self,
        factory: &Factory,
        type_name: &str,
        instance_name: &str,
        options: &[(&str, &str)],
    ) -> CompileResult<&mut Pass> {
        let pass = self.build_sub_pass(factory, type_name, instance_name, options)?;
        let subs = self.sub_passes_mut()?;
        subs.insert(0, pass);
        Ok(&mut subs[0])
    }

    /// Insert a sub-pass immediately before the target.
    pub fn insert_sub_pass_before(
        &mut self,
        target: &str,
        factory: &Factory,
        type_name: &str,
        instance_name: &str,
        options: &[(&str, &str)],
    ) -> CompileResult<()> {
        let (group, idx) = self.resolve_parent_mut(target)?;
        let pass = group.build_sub_pass(factory, type_name, instance_name, options)?;
        group.sub_passes_mut()?.insert(idx, pass);
        Ok(())
    }

    /// Insert a sub-pass immediately after the target.
    pub fn insert_sub_pass_after(
        &mut self,
        target: &str,
        factory: &Factory,
        type_name: &str,
        instance_name: &str,
        options: &[(&str, &str)],
    ) -> CompileResult<()> {
        let (group, idx) = self.resolve_parent_mut(target)?;
        let pass = group.build_sub_pass(factory, type_name, instance_name, options)?;
        group.sub_passes_mut()?.insert(idx + 1, pass);
        Ok(())
    }

    /// Wrap the target pass in a new singleton group. The group assumes
    /// the target's name; the target is renamed to `sub_name`. The pass
    /// order is unchanged.
    pub fn group_sub_pass(&mut self, target: &str, sub_name: &str) -> CompileResult<()> {
        validate_instance_name(sub_name)?;
        let (parent, idx) = self.resolve_parent_mut(target)?;
        let subs = parent.sub_passes_mut()?;
        let mut inner = subs.remove(idx);
        let group_name = std::mem::replace(&mut inner.instance_name, sub_name.to_string());
        let mut group = Pass::generic_group(group_name);
        group.sub_passes_mut()?.push(inner);
        subs.insert(idx, group);
        Ok(())
    }

    /// Wrap an inclusive range of passes into a new group named
    /// `group_name`, leaving the pass names unchanged. `from` and `to`
    /// must share their hierarchical prefix.
    pub fn group_sub_passes(
        &mut self,
        from: &str,
        to: &str,
        group_name: &str,
    ) -> CompileResult<()> {
        validate_instance_name(group_name)?;
        let prefix_of = |s: &str| s.rsplit_once('.').map(|(p, _)| p.to_string());
        if prefix_of(from) != prefix_of(to) {
            return Err(CompileError::RangePrefixMismatch {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let (_, from_idx) = self.resolve_parent_mut(from)?;
        let (parent, to_idx) = self.resolve_parent_mut(to)?;
        if from_idx > to_idx {
            return Err(CompileError::InvalidConfiguration(format!(
                "range start '{from}' comes after range end '{to}'"
            )));
        }
        let subs = parent.sub_passes_mut()?;
        let mut group = Pass::generic_group(group_name.to_string());
        let members: Vec<Pass> = subs.drain(from_idx..=to_idx).collect();
        *group.sub_passes_mut()? = members;
        subs.insert(from_idx, group);
        Ok(())
    }

    /// Inline an unconditional group into its parent, prefixing the names
    /// of its sub-passes with `prefix`. The pass order is unchanged.
    pub fn flatten_subgroup(&mut self, target: &str, prefix: &str) -> CompileResult<()> {
        let (parent, idx) = self.resolve_parent_mut(target)?;
        {
            let child = &parent.sub_passes()?[idx];
            if !child.is_group() {
                return Err(CompileError::NotAGroup(target.to_string()));
            }
            if child.is_conditional_group() {
                return Err(CompileError::ConditionalGroup(target.to_string()));
            }
        }
        let subs = parent.sub_passes_mut()?;
        let group = subs.remove(idx);
        let PassNode::Group { passes, .. } = group.node else {
            unreachable!("checked above");
        };
        let mut renamed = Vec::with_capacity(passes.len());
        for mut p in passes {
            p.instance_name = format!("{prefix}{}", p.instance_name);
            validate_instance_name(&p.instance_name)?;
            renamed.push(p);
        }
        for p in &renamed {
            if subs.iter().any(|s| s.instance_name == p.instance_name) {
                return Err(CompileError::DuplicateInstanceName(p.instance_name.clone()));
            }
        }
        for (offset, p) in renamed.into_iter().enumerate() {
            subs.insert(idx + offset, p);
        }
        Ok(())
    }

    /// Remove the pass at the target path.
    pub fn remove_sub_pass(&mut self, target: &str) -> CompileResult<()> {
        let (parent, idx) = self.resolve_parent_mut(target)?;
        parent.sub_passes_mut()?.remove(idx);
        Ok(())
    }

    /// Remove every sub-pass of this group.
    pub fn clear_sub_passes(&mut self) -> CompileResult<()> {
        self.sub_passes_mut()?.clear();
        Ok(())
    }

    /// Dotted names of every descendant pass, depth first.
    pub fn pass_names(&self) -> Vec<String> {
        let mut out = vec![];
        if let Ok(subs) = self.sub_passes() {
            for p in subs {
                out.push(p.instance_name.clone());
                for nested in p.pass_names() {
                    out.push(format!("{}.{}", p.instance_name, nested));
                }
            }
        }
        out
    }

    /// Set an option along a dotted path. The last element is the option
    /// name; the preceding elements select passes and may use `*`/`?`
    /// wildcards, or `**` to select every descendant. Returns the number
    /// of affected passes (matched and declaring the option).
    pub fn set_option(&mut self, path: &str, value: &str) -> CompileResult<usize> {
        let elems: Vec<&str> = path.split('.').collect();
        let (option, patterns) = elems.split_last().expect("split never yields empty");
        self.set_option_elems(patterns, option, value)
    }

    fn set_option_elems(
        &mut self,
        patterns: &[&str],
        option: &str,
        value: &str,
    ) -> CompileResult<usize> {
        match patterns.first() {
            None => {
                if self.options.has(option) {
                    self.options.set(option, value)?;
                    Ok(1)
                } else {
                    Ok(0)
                }
            }
            Some(&"**") => {
                // zero or more levels: match the rest here, and carry the
                // globstar into every child
                let mut count = self.set_option_elems(&patterns[1..], option, value)?;
                if let PassNode::Group { passes, .. } = &mut self.node {
                    for p in passes {
                        count += p.set_option_elems(patterns, option, value)?;
                    }
                }
                Ok(count)
            }
            Some(pattern) => {
                let mut count = 0;
                if let PassNode::Group { passes, .. } = &mut self.node {
                    for p in passes {
                        if matches_pattern(pattern, &p.instance_name) {
                            count += p.set_option_elems(&patterns[1..], option, value)?;
                        }
                    }
                }
                Ok(count)
            }
        }
    }

    /// Set an option on every descendant (and this pass) that declares
    /// it. Returns the number of affected passes.
    pub fn set_option_recursively(&mut self, option: &str, value: &str) -> CompileResult<usize> {
        let mut count = 0;
        if self.options.has(option) {
            self.options.set(option, value)?;
            count += 1;
        }
        if let PassNode::Group { passes, .. } = &mut self.node {
            for p in passes {
                count += p.set_option_recursively(option, value)?;
            }
        }
        Ok(count)
    }

    /// Read an option's effective value along an exact dotted path.
    pub fn get_option(&self, path: &str) -> CompileResult<String> {
        let (target, option) = match path.rsplit_once('.') {
            Some((t, o)) => (Some(t), o),
            None => (None, path),
        };
        let pass = match target {
            Some(t) => self.resolve(t)?,
            None => self,
        };
        pass.options.get_text(option)
    }

    /// Construct this pass and every descendant: fold in global defaults,
    /// freeze the options, and build leaf payloads or group expansions.
    /// Idempotent; newly added sub-passes are picked up by a later call.
    pub fn construct(&mut self, factory: &Factory) -> CompileResult<()> {
        if !self.options.is_frozen() {
            self.options.apply_global_defaults()?;
            self.options.freeze();
        }
        if matches!(self.node, PassNode::Unconstructed) {
            let def = self.def.as_ref().expect("typed pass has a definition");
            match def.construct(&self.options)? {
                Construction::Leaf(transform) => {
                    self.node = PassNode::Leaf(transform);
                }
                Construction::Group {
                    passes: specs,
                    conditional,
                } => {
                    // the pass elects to become a group; its sub-passes
                    // come from the same registry
                    self.node = PassNode::Group {
                        passes: vec![],
                        conditional,
                    };
                    for spec in specs {
                        let pairs: Vec<(&str, &str)> = spec
                            .options
                            .iter()
                            .map(|(k, v)| (k.as_str(), v.as_str()))
                            .collect();
                        self.append_sub_pass(
                            factory,
                            &spec.type_name,
                            &spec.instance_name,
                            &pairs,
                        )?;
                    }
                }
            }
        }
        if let PassNode::Group { passes, .. } = &mut self.node {
            for p in passes {
                p.construct(factory)?;
            }
        }
        Ok(())
    }

    /// Render this subtree with type names and explicitly set options.
    pub fn dump_strategy(&self) -> String {
        fn rec(pass: &Pass, indent: usize, out: &mut String) {
            let pad = "  ".repeat(indent);
            let type_name = if pass.type_name.is_empty() {
                "<group>"
            } else {
                &pass.type_name
            };
            out.push_str(&format!("{pad}{} ({type_name})", pass.instance_name));
            let set: Vec<String> = pass
                .options
                .iter()
                .filter(|d| d.was_set())
                .map(|d| format!("{}={}", d.name(), d.effective()))
                .collect();
            if !set.is_empty() {
                out.push_str(&format!(" [{}]", set.join(", ")));
            }
            out.push('\n');
            if let Ok(subs) = pass.sub_passes() {
                for p in subs {
                    rec(p, indent + 1, out);
                }
            }
        }
        let mut out = String::new();
        rec(self, 0, &mut out);
        out
    }
}

/// Owns the pass tree and the pass-type registry, and drives compilation.
pub struct PassManager {
    root: Pass,
    factory: Factory,
    output_prefix: String,
}

impl PassManager {
    /// An empty manager with the built-in pass types.
    pub fn new() -> Self {
        Self::with_factory(Factory::with_defaults())
    }

    /// An empty manager with a caller-supplied pass-type registry.
    pub fn with_factory(factory: Factory) -> Self {
        Self {
            root: Pass::generic_group("root".to_string()),
            factory,
            output_prefix: String::new(),
        }
    }

    /// The default pipeline for a platform, keyed by its
    /// `eqasm_compiler_name`.
    pub fn from_defaults(platform: &Platform) -> CompileResult<Self> {
        let mut pm = Self::new();
        match platform.eqasm_compiler_name.as_str() {
            "cc" | "cc_light" => {
                pm.append_pass("sch.Schedule", "scheduler", &[])?;
                pm.append_pass("ana.Statistics", "statistics", &[])?;
            }
            _ => {
                pm.append_pass("sch.Schedule", "scheduler", &[])?;
            }
        }
        Ok(pm)
    }

    /// Prefix (typically a directory) for every output artifact.
    pub fn set_output_prefix(&mut self, prefix: impl Into<String>) {
        self.output_prefix = prefix.into();
    }

    /// The root group.
    pub fn root(&self) -> &Pass {
        &self.root
    }

    /// The root group, mutable. Structural mutations are permitted any
    /// time outside `compile`.
    pub fn root_mut(&mut self) -> &mut Pass {
        &mut self.root
    }

    /// Append a pass to the root group.
    pub fn append_pass(
        &mut self,
        type_name: &str,
        instance_name: &str,
        options: &[(&str, &str)],
    ) -> CompileResult<()> {
        let factory = self.factory.clone();
        self.root
            .append_sub_pass(&factory, type_name, instance_name, options)?;
        Ok(())
    }

    /// Prepend a pass to the root group.
    pub fn prefix_pass(
        &mut self,
        type_name: &str,
        instance_name: &str,
        options: &[(&str, &str)],
    ) -> CompileResult<()> {
        let factory = self.factory.clone();
        self.root
            .prefix_sub_pass(&factory, type_name, instance_name, options)?;
        Ok(())
    }

    /// Insert a pass immediately before the target path.
    pub fn insert_pass_before(
        &mut self,
        target: &str,
        type_name: &str,
        instance_name: &str,
        options: &[(&str, &str)],
    ) -> CompileResult<()> {
        let factory = self.factory.clone();
        self.root
            .insert_sub_pass_before(target, &factory, type_name, instance_name, options)
    }

    /// Insert a pass immediately after the target path.
    pub fn insert_pass_after(
        &mut self,
        target: &str,
        type_name: &str,
        instance_name: &str,
        options: &[(&str, &str)],
    ) -> CompileResult<()> {
        let factory = self.factory.clone();
        self.root
            .insert_sub_pass_after(target, &factory, type_name, instance_name, options)
    }

    /// See [`Pass::group_sub_pass`].
    pub fn group_pass(&mut self, target: &str, sub_name: &str) -> CompileResult<()> {
        self.root.group_sub_pass(target, sub_name)
    }

    /// See [`Pass::group_sub_passes`].
    pub fn group_passes(&mut self, from: &str, to: &str, group_name: &str) -> CompileResult<()> {
        self.root.group_sub_passes(from, to, group_name)
    }

    /// See [`Pass::flatten_subgroup`].
    pub fn flatten_subgroup(&mut self, target: &str, prefix: &str) -> CompileResult<()> {
        self.root.flatten_subgroup(target, prefix)
    }

    /// Remove the pass at the target path.
    pub fn remove_pass(&mut self, target: &str) -> CompileResult<()> {
        self.root.remove_sub_pass(target)
    }

    /// Remove every pass.
    pub fn clear_passes(&mut self) {
        self.root
            .clear_sub_passes()
            .expect("root is always a group");
    }

    /// The pass at an exact dotted path.
    pub fn get_pass(&self, target: &str) -> CompileResult<&Pass> {
        self.root.resolve(target)
    }

    /// Whether a pass exists at an exact dotted path.
    pub fn does_pass_exist(&self, target: &str) -> bool {
        self.root.does_pass_exist(target)
    }

    /// Dotted names of every pass in the tree.
    pub fn pass_names(&self) -> Vec<String> {
        self.root.pass_names()
    }

    /// Total number of passes in the tree.
    pub fn get_num_passes(&self) -> usize {
        self.pass_names().len()
    }

    /// Set a pass option along a wildcard path; see [`Pass::set_option`].
    /// With `must_exist`, affecting zero passes is an error.
    pub fn set_option(&mut self, path: &str, value: &str, must_exist: bool) -> CompileResult<usize> {
        let count = self.root.set_option(path, value)?;
        if count == 0 && must_exist {
            return Err(CompileError::NoPassAffected(path.to_string()));
        }
        Ok(count)
    }

    /// Set an option on every pass that declares it.
    pub fn set_option_recursively(
        &mut self,
        option: &str,
        value: &str,
        must_exist: bool,
    ) -> CompileResult<usize> {
        let count = self.root.set_option_recursively(option, value)?;
        if count == 0 && must_exist {
            return Err(CompileError::NoPassAffected(option.to_string()));
        }
        Ok(count)
    }

    /// Read an option's effective value at an exact dotted path.
    pub fn get_option(&self, path: &str) -> CompileResult<String> {
        self.root.get_option(path)
    }

    /// Construct every pass, freezing options. Idempotent.
    pub fn construct(&mut self) -> CompileResult<()> {
        let factory = self.factory.clone();
        self.root.construct(&factory)
    }

    /// Render the configured strategy.
    pub fn dump_strategy(&self) -> String {
        self.root.dump_strategy()
    }

    /// Render documentation for every registered pass type.
    pub fn dump_pass_types(&self) -> String {
        self.factory.dump_pass_types()
    }

    /// Construct (if needed) and run every pass on the program, depth
    /// first. Skipped passes are logged and stepped over; a pass failure
    /// aborts the run, annotated with the fully qualified pass path.
    #[instrument(skip(self, program))]
    pub fn compile(&mut self, program: &mut Program) -> CompileResult<()> {
        self.construct()?;
        info!(
            passes = self.get_num_passes(),
            kernels = program.kernels.len(),
            "running pass manager"
        );
        let mut resources = ResourceManager::from_platform(&program.platform);
        Self::run_group(
            &self.root,
            "",
            program,
            &mut resources,
            &self.output_prefix,
        )
    }

    fn run_group(
        group: &Pass,
        parent_path: &str,
        program: &mut Program,
        resources: &mut ResourceManager,
        output_prefix: &str,
    ) -> CompileResult<()> {
        for pass in group.sub_passes().expect("run_group takes groups") {
            let path = if parent_path.is_empty() {
                pass.instance_name.clone()
            } else {
                format!("{parent_path}.{}", pass.instance_name)
            };

            if pass.options.as_bool("skip") {
                info!(pass = %path, "skipping");
                continue;
            }

            match &pass.node {
                PassNode::Group { .. } => {
                    Self::run_group(pass, &path, program, resources, output_prefix)?;
                }
                PassNode::Leaf(transform) => {
                    debug!(pass = %path, "running");
                    let prefix = format!(
                        "{output_prefix}{}_{}",
                        program.name,
                        path.replace('.', "_")
                    );
                    let platform = program.platform.clone();
                    let ctx = Context::new(&prefix, &path, &platform, resources);
                    let result = match transform {
                        Transform::Program(t) => t.run(program, &ctx),
                        Transform::ProgramAnalysis(t) => t.run(program, &ctx),
                        Transform::Kernel(t) => program
                            .kernels
                            .iter_mut()
                            .try_for_each(|k| t.run(k, &ctx)),
                        Transform::KernelAnalysis(t) => {
                            program.kernels.iter().try_for_each(|k| t.run(k, &ctx))
                        }
                    };
                    if let Err(e) = result {
                        error!(pass = %path, error = %e, "pass failed");
                        return Err(CompileError::PassFailed {
                            pass: path,
                            reason: e.to_string(),
                        });
                    }
                    if pass.platform_transformer {
                        // the pass may have swapped the platform; rebuild
                        // platform-derived state for later passes
                        *resources = ResourceManager::from_platform(&program.platform);
                    }
                }
                PassNode::Unconstructed => {
                    unreachable!("compile constructs the tree first")
                }
            }
        }
        Ok(())
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        assert!(matches_pattern("mapper", "mapper"));
        assert!(matches_pattern("*", "anything"));
        assert!(matches_pattern("map*", "mapper"));
        assert!(matches_pattern("m?pper", "mapper"));
        assert!(!matches_pattern("m?pper", "mapper2"));
        assert!(matches_pattern("*er", "scheduler"));
        assert!(!matches_pattern("map*", "scheduler"));
        assert!(matches_pattern("", ""));
        assert!(!matches_pattern("", "x"));
    }

    #[test]
    fn test_instance_name_validation() {
        assert!(validate_instance_name("scheduler").is_ok());
        assert!(validate_instance_name("_x2").is_ok());
        assert!(validate_instance_name("2x").is_err());
        assert!(validate_instance_name("a.b").is_err());
        assert!(validate_instance_name("").is_err());
    }

    #[test]
    fn test_derive_instance_name() {
        assert_eq!(derive_instance_name("sch.Schedule"), "schedule");
        assert_eq!(derive_instance_name("Plain"), "plain");
    }

    #[test]
    fn test_append_and_resolve() {
        let mut pm = PassManager::new();
        pm.append_pass("sch.Schedule", "scheduler", &[]).unwrap();
        assert!(pm.does_pass_exist("scheduler"));
        assert!(!pm.does_pass_exist("mapper"));
        assert_eq!(pm.get_pass("scheduler").unwrap().type_name(), "sch.Schedule");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut pm = PassManager::new();
        pm.append_pass("sch.Schedule", "scheduler", &[]).unwrap();
        assert!(matches!(
            pm.append_pass("sch.Schedule", "scheduler", &[]),
            Err(CompileError::DuplicateInstanceName(_))
        ));
    }

    #[test]
    fn test_derived_names_uniquify() {
        let mut pm = PassManager::new();
        pm.append_pass("sch.Schedule", "", &[]).unwrap();
        pm.append_pass("sch.Schedule", "", &[]).unwrap();
        assert!(pm.does_pass_exist("schedule"));
        assert!(pm.does_pass_exist("schedule_1"));
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut pm = PassManager::new();
        pm.append_pass("sch.Schedule", "a", &[]).unwrap();
        pm.append_pass("sch.Schedule", "c", &[]).unwrap();
        pm.insert_pass_after("a", "sch.Schedule", "b", &[]).unwrap();
        pm.insert_pass_before("a", "sch.Schedule", "pre", &[]).unwrap();
        assert_eq!(
            pm.root().sub_pass_names(),
            vec!["pre", "a", "b", "c"]
        );
    }

    #[test]
    fn test_set_option_wildcards() {
        let mut pm = PassManager::new();
        pm.append_pass("", "mapper", &[]).unwrap();
        {
            let factory = pm.factory.clone();
            let mapper = pm.root_mut().sub_passes_mut().unwrap().get_mut(0).unwrap();
            mapper.append_sub_pass(&factory, "sch.Schedule", "pre", &[]).unwrap();
            mapper.append_sub_pass(&factory, "sch.Schedule", "post", &[]).unwrap();
        }
        pm.append_pass("sch.Schedule", "scheduler", &[]).unwrap();

        // immediate children of mapper
        let n = pm.set_option("mapper.*.skip", "yes", true).unwrap();
        assert_eq!(n, 2);
        assert_eq!(pm.get_option("mapper.pre.skip").unwrap(), "true");
        assert_eq!(pm.get_option("scheduler.skip").unwrap(), "false");

        // recursive descent
        let n = pm.set_option("**.scheduler_target", "asap", true).unwrap();
        assert_eq!(n, 3);
        assert_eq!(pm.get_option("scheduler.scheduler_target").unwrap(), "asap");
        assert_eq!(pm.get_option("mapper.post.scheduler_target").unwrap(), "asap");

        // must_exist
        assert!(matches!(
            pm.set_option("nobody.skip", "yes", true),
            Err(CompileError::NoPassAffected(_))
        ));
        assert_eq!(pm.set_option("nobody.skip", "yes", false).unwrap(), 0);
    }

    #[test]
    fn test_set_option_recursively() {
        let mut pm = PassManager::new();
        pm.append_pass("sch.Schedule", "a", &[]).unwrap();
        pm.append_pass("sch.Schedule", "b", &[]).unwrap();
        // root declares skip too
        let n = pm.set_option_recursively("skip", "yes", true).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_group_and_flatten_are_inverse() {
        let mut pm = PassManager::new();
        pm.append_pass("sch.Schedule", "a", &[]).unwrap();
        pm.append_pass("sch.Schedule", "b", &[]).unwrap();
        let before = pm.root().sub_pass_names();

        pm.group_pass("a", "a").unwrap();
        assert!(pm.get_pass("a").unwrap().is_group());
        assert!(pm.does_pass_exist("a.a"));

        pm.flatten_subgroup("a", "").unwrap();
        assert_eq!(pm.root().sub_pass_names(), before);
        assert!(!pm.get_pass("a").unwrap().is_group());
    }

    #[test]
    fn test_flatten_with_prefix() {
        let mut pm = PassManager::new();
        pm.append_pass("", "a", &[]).unwrap();
        {
            let factory = pm.factory.clone();
            let a = pm.root_mut().sub_passes_mut().unwrap().get_mut(0).unwrap();
            a.append_sub_pass(&factory, "sch.Schedule", "a1", &[]).unwrap();
            a.append_sub_pass(&factory, "sch.Schedule", "a2", &[]).unwrap();
        }
        pm.append_pass("sch.Schedule", "b", &[]).unwrap();

        pm.flatten_subgroup("a", "a_").unwrap();
        assert_eq!(pm.root().sub_pass_names(), vec!["a_a1", "a_a2", "b"]);
    }

    #[test]
    fn test_group_range() {
        let mut pm = PassManager::new();
        for name in ["a", "b", "c", "d"] {
            pm.append_pass("sch.Schedule", name, &[]).unwrap();
        }
        pm.group_passes("b", "c", "mid").unwrap();
        assert_eq!(pm.root().sub_pass_names(), vec!["a", "mid", "d"]);
        assert_eq!(pm.get_pass("mid").unwrap().sub_pass_names(), vec!["b", "c"]);
    }

    #[test]
    fn test_group_range_prefix_mismatch() {
        let mut pm = PassManager::new();
        pm.append_pass("", "g", &[]).unwrap();
        {
            let factory = pm.factory.clone();
            let g = pm.root_mut().sub_passes_mut().unwrap().get_mut(0).unwrap();
            g.append_sub_pass(&factory, "sch.Schedule", "inner", &[]).unwrap();
        }
        pm.append_pass("sch.Schedule", "outer", &[]).unwrap();
        assert!(matches!(
            pm.group_passes("g.inner", "outer", "bad"),
            Err(CompileError::RangePrefixMismatch { .. })
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut pm = PassManager::new();
        pm.append_pass("sch.Schedule", "a", &[]).unwrap();
        pm.append_pass("sch.Schedule", "b", &[]).unwrap();
        pm.remove_pass("a").unwrap();
        assert_eq!(pm.root().sub_pass_names(), vec!["b"]);
        pm.clear_passes();
        assert!(pm.root().sub_pass_names().is_empty());
    }

    #[test]
    fn test_construct_freezes_options() {
        let mut pm = PassManager::new();
        pm.append_pass("sch.Schedule", "scheduler", &[]).unwrap();
        pm.set_option("scheduler.scheduler_target", "asap", true).unwrap();
        pm.construct().unwrap();
        assert!(matches!(
            pm.set_option("scheduler.scheduler_target", "alap", true),
            Err(CompileError::OptionFrozen(_))
        ));
        // structure stays mutable after construction
        pm.append_pass("sch.Schedule", "late", &[]).unwrap();
        pm.construct().unwrap();
    }

    #[test]
    fn test_num_passes_counts_recursively() {
        let mut pm = PassManager::new();
        pm.append_pass("", "g", &[]).unwrap();
        {
            let factory = pm.factory.clone();
            let g = pm.root_mut().sub_passes_mut().unwrap().get_mut(0).unwrap();
            g.append_sub_pass(&factory, "sch.Schedule", "x", &[]).unwrap();
        }
        pm.append_pass("sch.Schedule", "y", &[]).unwrap();
        assert_eq!(pm.get_num_passes(), 3);
        assert_eq!(pm.pass_names(), vec!["g", "g.x", "y"]);
    }

    #[test]
    fn test_dump_strategy_shows_set_options() {
        let mut pm = PassManager::new();
        pm.append_pass("sch.Schedule", "scheduler", &[("scheduler_target", "asap")])
            .unwrap();
        let dump = pm.dump_strategy();
        assert!(dump.contains("scheduler (sch.Schedule)"));
        assert!(dump.contains("scheduler_target=asap"));
    }
}
