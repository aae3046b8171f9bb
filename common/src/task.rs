use serde::{Deserialize, Serialize};

use crate::phase::JobPhase;

/// Argumentos de una tarea tal como viajan al worker.
/// Una tarea fallida se reenvía idéntica, nunca se modifica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoTaskArgs {
    pub job_name: String,
    pub phase: JobPhase,

    /// Número de tarea dentro de la fase (0..ntasks)
    pub task_number: usize,

    /// Archivo de entrada; sólo lo tienen las tareas map
    pub input_file: Option<String>,

    /// Map: cantidad de reduces (particiones de salida).
    /// Reduce: cantidad de maps (archivos de entrada a juntar).
    pub num_other_phase: usize,
}

impl DoTaskArgs {
    pub fn for_phase(
        job_name: &str,
        phase: JobPhase,
        task_number: usize,
        map_files: &[String],
        num_other_phase: usize,
    ) -> Self {
        let input_file = match phase {
            JobPhase::Map => map_files.get(task_number).cloned(),
            JobPhase::Reduce => None,
        };

        Self {
            job_name: job_name.to_string(),
            phase,
            task_number,
            input_file,
            num_other_phase,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoTaskReply {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_phase_solo_asigna_archivo_a_tareas_map() {
        let files = vec!["a.txt".to_string(), "b.txt".to_string()];

        let map = DoTaskArgs::for_phase("job", JobPhase::Map, 1, &files, 3);
        assert_eq!(map.input_file.as_deref(), Some("b.txt"));
        assert_eq!(map.num_other_phase, 3);

        let reduce = DoTaskArgs::for_phase("job", JobPhase::Reduce, 1, &files, 2);
        assert_eq!(reduce.input_file, None);
        assert_eq!(reduce.task_number, 1);
    }
}
