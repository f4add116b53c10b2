//! Plugin lifecycle.
//!
//! The host drives plugins through a fixed sequence of phases, once each per
//! build. Only graph construction is mandatory; the other hooks default to
//! no-ops.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::Result;
use crate::compilation::Compilation;

/// Build phases that call into plugins, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildPhase {
    /// Before seal. Plugins add chunks and modules to the graph.
    ConstructGraph = 0,

    /// After seal rendered chunk files into the asset table.
    OptimizeAssets = 10,

    /// After the compilation is complete, before anything is written.
    AfterCompile = 20,

    /// After every asset has been written to the output directory.
    AfterEmit = 30,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhase::ConstructGraph => "construct-graph",
            BuildPhase::OptimizeAssets => "optimize-assets",
            BuildPhase::AfterCompile => "after-compile",
            BuildPhase::AfterEmit => "after-emit",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plugin participating in the build lifecycle.
///
/// `State` is created by [`construct_graph`](BuildPlugin::construct_graph) and
/// handed to every later phase of the same build, then consumed by
/// [`after_emit`](BuildPlugin::after_emit). Keeping per-build data there instead
/// of on `self` lets one plugin instance serve concurrent builds.
///
/// Returning `Err` from any phase aborts the build. Recoverable problems should
/// be pushed onto [`Compilation::push_error`] / [`Compilation::push_warning`]
/// instead.
#[async_trait]
pub trait BuildPlugin: Send + Sync {
    /// Per-build state threaded through the phases.
    type State: Send;

    /// Returns the plugin name for diagnostics and logging
    fn name(&self) -> Cow<'static, str>;

    /// Graph construction. Runs before seal.
    fn construct_graph(&self, compilation: &mut Compilation) -> Result<Self::State>;

    /// Asset optimization. Chunk files are rendered and the build hash is known.
    fn optimize_assets(
        &self,
        _compilation: &mut Compilation,
        _state: &mut Self::State,
    ) -> Result<()> {
        Ok(())
    }

    /// Post-compile. The asset table is final apart from plugin edits.
    fn after_compile(&self, _compilation: &mut Compilation, _state: &mut Self::State) -> Result<()> {
        Ok(())
    }

    /// Post-emit. The host awaits the returned future before finishing the build.
    async fn after_emit(&self, _compilation: &mut Compilation, _state: Self::State) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut phases = vec![
            BuildPhase::AfterEmit,
            BuildPhase::ConstructGraph,
            BuildPhase::AfterCompile,
            BuildPhase::OptimizeAssets,
        ];
        phases.sort();
        assert_eq!(
            phases,
            vec![
                BuildPhase::ConstructGraph,
                BuildPhase::OptimizeAssets,
                BuildPhase::AfterCompile,
                BuildPhase::AfterEmit,
            ]
        );
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(BuildPhase::AfterEmit.to_string(), "after-emit");
        assert_eq!(BuildPhase::ConstructGraph.to_string(), "construct-graph");
    }
}
