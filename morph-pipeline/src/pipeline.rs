//! The compilation pass run when a marked definition is evaluated
//!
//! extract → normalize → parse → remap → strip marker → transform →
//! repair spans → generate → compile → extract the target binding

use std::rc::Rc;

use morph_core::{DefinitionContext, DefinitionRef, MacroHook, SourceRegistry, Value};
use morph_host::Loader;
use tracing::{debug, info, warn};

use crate::codegen::{CodeGenerator, GeneratedUnit};
use crate::config::PassOptions;
use crate::error::{PipelineError, Result, TransformError};
use crate::extract::{DefinitionSite, SourceExtractor};
use crate::host::{Grammar, HostCompiler};
use crate::marker::MarkerStripper;
use crate::remap::{repair_spans, ParsedDefinition};
use crate::scope::ScopeBinder;
use crate::transform::{TransformContext, Transformed, Transformer};
use crate::virtual_module::VirtualModuleRegistry;

/// Result of one pass
#[derive(Debug)]
pub struct Compiled {
    /// Replacement for the definition
    pub value: Value,
    /// Absent when the transformer returned a value directly
    pub generated: Option<GeneratedUnit>,
    pub site: DefinitionSite,
}

pub struct Pipeline {
    grammar: Rc<dyn Grammar>,
    compiler: Rc<dyn HostCompiler>,
    sources: SourceRegistry,
    virtual_modules: VirtualModuleRegistry,
}

impl Pipeline {
    pub fn new(
        grammar: Rc<dyn Grammar>,
        compiler: Rc<dyn HostCompiler>,
        sources: SourceRegistry,
    ) -> Self {
        Self {
            virtual_modules: VirtualModuleRegistry::new(compiler.clone(), sources.clone()),
            grammar,
            compiler,
            sources,
        }
    }

    /// Pipeline compiling through `loader` and sharing its source registry
    pub fn for_loader(loader: &Loader) -> Self {
        Self::new(
            Rc::new(loader.grammar()),
            Rc::new(loader.clone()),
            loader.sources().clone(),
        )
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn virtual_modules(&self) -> &VirtualModuleRegistry {
        &self.virtual_modules
    }

    /// Recovers and normalizes the text of a definition
    pub fn extract(&self, definition: &DefinitionRef) -> Result<DefinitionSite> {
        SourceExtractor::new(&self.sources).extract(definition)
    }

    /// Runs one full pass over `definition`
    pub fn compile_definition(
        &self,
        definition: &DefinitionRef,
        context: &DefinitionContext,
        transformer: &dyn Transformer,
        options: &PassOptions,
    ) -> Result<Compiled> {
        debug!(
            "Pass over '{}' at {}:{}",
            definition.name, definition.file, definition.line
        );
        let site = self.extract(definition)?;

        let graph = self
            .grammar
            .parse(&site.normalized, &site.file)
            .map_err(|err| reparse_failure(&site, err.to_string()))?;
        let parsed = ParsedDefinition::from_module(graph, &site.name)
            .map_err(|reason| reparse_failure(&site, reason))?;
        let mut positioned = parsed.remap(&site);
        MarkerStripper::strip_front(positioned.graph_mut());

        let transform_context = TransformContext {
            site: &site,
            dsl: &options.dsl,
            nested: context.nested,
        };
        let mut graph = match transformer.transform(positioned.into_graph(), &transform_context)? {
            Transformed::Definition(graph) => graph,
            Transformed::Value(value) => {
                info!("Replaced '{}' with a {}", site.name, value.type_name());
                return Ok(Compiled {
                    value,
                    generated: None,
                    site,
                });
            }
        };

        let target = match graph.root_function() {
            Some((_, def)) => def.name.clone(),
            None => {
                return Err(TransformError::InvalidTree(
                    "transformer must return a function definition".to_string(),
                )
                .into())
            }
        };
        graph.validate().map_err(TransformError::from)?;
        repair_spans(&mut graph);

        let binding = ScopeBinder::new(&self.virtual_modules).bind(
            &options.scope,
            &context.ambient,
            &target,
        );
        let file = self.sources.fresh_file(&format!("morph:{target}"));
        let unit = CodeGenerator::new(self.grammar.as_ref(), self.compiler.as_ref())
            .generate(&graph, &site, &binding, file)?;

        if options.print_codegen {
            eprintln!("# {}\n{}", unit.file, unit.text);
            info!("Generated code for '{}':\n{}", target, unit.text);
        }

        self.sources
            .register_generated(unit.file.clone(), unit.text.as_str(), unit.origin.clone());
        self.compiler
            .compile(&unit.text, &unit.file, binding.lookup(), binding.write())
            .map_err(|err| PipelineError::from_host(err, &self.sources, &unit.text))?;

        let value = binding
            .write()
            .get(&target)
            .ok_or_else(|| PipelineError::MissingTarget {
                name: target.clone(),
            })?;
        info!(
            "Compiled '{}' from {}:{} as {} ({} scope)",
            target,
            site.file,
            site.start_line,
            unit.file,
            binding.tier()
        );

        Ok(Compiled {
            value,
            generated: Some(unit),
            site,
        })
    }

    /// A marker value that runs `transformer` over the definitions it leads
    pub fn marker(
        self: &Rc<Self>,
        name: impl Into<String>,
        transformer: impl Transformer + 'static,
        options: PassOptions,
    ) -> Value {
        Value::Macro(Rc::new(Marker {
            name: name.into(),
            pipeline: self.clone(),
            transformer: Box::new(transformer),
            options,
        }))
    }

}

fn reparse_failure(site: &DefinitionSite, error: String) -> PipelineError {
    warn!(
        "Reparse of '{}' failed: {}\n--- raw ---\n{}--- normalized ---\n{}",
        site.name, error, site.raw, site.normalized
    );
    PipelineError::ReparseFailure {
        name: site.name.clone(),
        raw: site.raw.clone(),
        normalized: site.normalized.clone(),
        error,
    }
}

/// Host-facing trigger bound to a transformer and its options
pub struct Marker {
    name: String,
    pipeline: Rc<Pipeline>,
    transformer: Box<dyn Transformer>,
    options: PassOptions,
}

impl MacroHook for Marker {
    fn name(&self) -> &str {
        &self.name
    }

    fn expand(
        &self,
        definition: &DefinitionRef,
        context: &DefinitionContext,
    ) -> anyhow::Result<Value> {
        let compiled = self.pipeline.compile_definition(
            definition,
            context,
            self.transformer.as_ref(),
            &self.options,
        )?;
        Ok(compiled.value)
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
