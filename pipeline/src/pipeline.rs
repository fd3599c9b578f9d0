use crate::{
    config::{FilterConfig, MissingColumnPolicy},
    dataset::{Dataset, DatasetError},
    stages::{
        AbsoluteCycle, DifferentialVoltage, NormalizeVoltage, Offset, RangeFilter, RemovePause,
        SelectCycle, SelectHalfCycle, Stage, StageKind, StepChange,
    },
};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("Column '{column}' required by the {stage} is missing")]
    MissingColumn { stage: &'static str, column: String },
    #[error("No rows remain after the {after}")]
    EmptyResult { after: &'static str },
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// An ordered list of stages, applied one after the other to a dataset.
///
/// Filters always precede modifications. If the filters leave no rows the run stops with
/// [PipelineError::EmptyResult] and no modification is applied.
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    missing_column: MissingColumnPolicy,
}

impl Pipeline {
    /// Assembles the stages enabled in `config`, in their fixed order.
    pub fn from_config(config: &FilterConfig) -> Self {
        let mut stages = Vec::<Box<dyn Stage>>::new();
        if config.remove_pause {
            stages.push(Box::new(RemovePause));
        }
        if config.select_cycle {
            stages.push(Box::new(SelectCycle {
                column: config.cycle_column,
                cycle: config.selected_cycle(),
            }));
        }
        if config.select_charge {
            stages.push(Box::new(SelectHalfCycle::charge()));
        }
        if config.select_discharge {
            stages.push(Box::new(SelectHalfCycle::discharge()));
        }
        if config.apply_step_change {
            stages.push(Box::new(StepChange {
                column: config.step_change_column.clone(),
            }));
        }
        if config.apply_range_filter {
            stages.push(Box::new(RangeFilter {
                column: config.range_column.clone(),
                interval: config.range(),
            }));
        }
        if config.compute_abs_cycle {
            stages.push(Box::new(AbsoluteCycle));
        }
        if config.compute_du_dq {
            stages.push(Box::new(DifferentialVoltage {
                capacity_column: config.capacity_column(),
            }));
        }
        if config.normalize_voltage {
            stages.push(Box::new(NormalizeVoltage));
        }
        if config.apply_offset {
            stages.push(Box::new(Offset {
                column: config.offset_column.clone(),
                value: config.offset_value,
                mode: config.offset_mode,
            }));
        }
        Self {
            stages,
            missing_column: config.missing_column,
        }
    }

    /// Names of the stages, in the order they are applied.
    pub fn stage_names(&self) -> impl Iterator<Item = &'static str> {
        self.stages.iter().map(|stage| stage.name())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    #[instrument(skip_all, level = "debug", fields(stages = self.stages.len(), rows_in = dataset.num_rows(), rows_out), err(level = "warn"))]
    pub fn run(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        if dataset.is_empty() {
            return Err(PipelineError::EmptyResult { after: "loading" });
        }
        let mut current = dataset.clone();
        for stage in &self.stages {
            current = match stage.apply(&current) {
                Ok(next) => next,
                Err(PipelineError::MissingColumn { column, .. })
                    if self.missing_column == MissingColumnPolicy::Skip =>
                {
                    error!("Column '{column}' not found, skipping the {}", stage.name());
                    current
                }
                Err(e) => return Err(e),
            };
            debug!("{} left {} rows", stage.name(), current.num_rows());
            if stage.kind() == StageKind::Filter && current.is_empty() {
                return Err(PipelineError::EmptyResult {
                    after: stage.name(),
                });
            }
        }
        tracing::Span::current().record("rows_out", current.num_rows());
        Ok(current)
    }
}

/// Applies every filter and modification enabled in `config` to `dataset`.
pub fn apply_filters(dataset: &Dataset, config: &FilterConfig) -> Result<Dataset, PipelineError> {
    let pipeline = Pipeline::from_config(config);
    info!(
        "Applying {} stages: {}",
        pipeline.len(),
        pipeline.stage_names().collect::<Vec<_>>().join(", ")
    );
    pipeline.run(dataset)
}
