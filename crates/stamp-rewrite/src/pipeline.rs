//! Staged rewrite pipeline
//!
//! `Loaded → Resolved → Rewritten → Serialized`. Each stage consumes the
//! previous one, so a stage cannot be skipped or run twice, and an error at
//! any stage leaves nothing behind but the error.

use crate::config::RewriteConfig;
use crate::error::RewriteError;
use crate::report::RewriteReport;
use indexmap::IndexMap;
use stamp_annotate::{check_releases, merge_declaration, order_records, plan, AnnotationRecord};
use stamp_manifest::Manifest;
use stamp_symbol::{resolve, DeclarationIndex, QualifiedName};
use stamp_syntax::{parse_module, Item, Module};
use tracing::{debug, info, warn};

/// Manifest and source parsed
#[derive(Debug)]
pub struct Loaded {
    manifest: Manifest,
    source: String,
    module: Module,
}

/// Declarations indexed
#[derive(Debug)]
pub struct Resolved {
    loaded: Loaded,
    index: DeclarationIndex,
}

/// Decorators merged
#[derive(Debug)]
pub struct Rewritten {
    source: String,
    module: Module,
    report: RewriteReport,
}

/// Final text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serialized {
    /// Rewritten source
    pub output: String,
    /// What the run did
    pub report: RewriteReport,
}

/// One rewrite run in stage `S`
#[derive(Debug)]
pub struct Pipeline<'c, S> {
    config: &'c RewriteConfig,
    state: S,
}

impl<'c> Pipeline<'c, Loaded> {
    /// Parse both inputs
    ///
    /// # Errors
    /// Returns `RewriteError::Schema` or `RewriteError::Parse`.
    pub fn load(config: &'c RewriteConfig, manifest: &[u8], source: impl Into<String>) -> Result<Self, RewriteError> {
        let manifest = Manifest::load(manifest)?;
        let source = source.into();
        let module = parse_module(&source)?;
        info!(
            component = manifest.component(),
            entries = manifest.len(),
            items = module.body().len(),
            "loaded"
        );
        Ok(Self {
            config,
            state: Loaded {
                manifest,
                source,
                module,
            },
        })
    }

    /// Parsed manifest
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.state.manifest
    }

    /// Index test declarations
    ///
    /// # Errors
    /// Returns `RewriteError::Resolve` on duplicate qualified names.
    pub fn resolve(self) -> Result<Pipeline<'c, Resolved>, RewriteError> {
        let index = resolve(&self.state.module, &self.config.naming)?;
        info!(declarations = index.len(), "resolved");
        Ok(Pipeline {
            config: self.config,
            state: Resolved {
                loaded: self.state,
                index,
            },
        })
    }
}

impl<'c> Pipeline<'c, Resolved> {
    /// Declaration index
    #[must_use]
    pub fn index(&self) -> &DeclarationIndex {
        &self.state.index
    }

    /// Synthesize records and merge them onto every test declaration
    ///
    /// Declarations are visited innermost first.
    ///
    /// # Errors
    /// Returns `RewriteError::Synthesis` for unencodable entries or two
    /// releases of one component reaching the same declaration, and
    /// `RewriteError::UnmatchedTargets` in strict mode.
    pub fn rewrite(self) -> Result<Pipeline<'c, Rewritten>, RewriteError> {
        let Resolved { loaded, index } = self.state;
        let plan = plan(&loaded.manifest)?;
        let placeholder = self.config.merge.placeholder(loaded.manifest.component())?;

        let mut assigned: IndexMap<&QualifiedName, Vec<AnnotationRecord>> = IndexMap::new();
        let mut unmatched = Vec::new();
        for (target, records) in &plan {
            let found = index.lookup(target);
            if found.is_empty() {
                warn!(target = %target, "manifest target matches no declaration");
                unmatched.push(target.clone());
                continue;
            }
            for (name, _) in found {
                assigned.entry(name).or_default().extend(records.iter().cloned());
            }
        }
        if self.config.strict && !unmatched.is_empty() {
            return Err(RewriteError::UnmatchedTargets(unmatched));
        }
        for (name, records) in &mut assigned {
            order_records(records);
            check_releases(name, records)?;
        }

        let mut module = loaded.module;
        let mut report = RewriteReport {
            declarations: index.len(),
            unmatched,
            ..RewriteReport::default()
        };
        for (name, declaration) in index.iter().rev() {
            let Some(head) = module.get(&declaration.path).and_then(Item::head) else {
                continue;
            };
            let records = assigned.get(name).map_or(&[][..], Vec::as_slice);
            let merged = merge_declaration(head, declaration.kind, records, placeholder.as_ref());
            if merged.placeholder {
                report.placeholders += 1;
            }
            if !merged.changed {
                continue;
            }
            debug!(
                declaration = %name,
                records = records.len(),
                placeholder = merged.placeholder,
                "rewriting decorators"
            );
            if let Some(updated) = module.with_decorators_at(&declaration.path, merged.decorators) {
                module = updated;
                report.rewritten += 1;
            }
        }
        info!(
            rewritten = report.rewritten,
            placeholders = report.placeholders,
            unmatched = report.unmatched.len(),
            "rewritten"
        );

        Ok(Pipeline {
            config: self.config,
            state: Rewritten {
                source: loaded.source,
                module,
                report,
            },
        })
    }
}

impl Pipeline<'_, Rewritten> {
    /// Rewritten tree
    #[must_use]
    pub fn module(&self) -> &Module {
        &self.state.module
    }

    /// Print the tree
    #[must_use]
    pub fn serialize(self) -> Serialized {
        let Rewritten {
            source,
            module,
            mut report,
        } = self.state;
        let output = module.to_source();
        report.changed = output != source;
        Serialized { output, report }
    }
}

/// Run every stage on in-memory inputs
///
/// # Errors
/// Propagates the first stage error.
pub fn rewrite_source(manifest: &[u8], source: &str, config: &RewriteConfig) -> Result<Serialized, RewriteError> {
    Ok(Pipeline::load(config, manifest, source)?
        .resolve()?
        .rewrite()?
        .serialize())
}
