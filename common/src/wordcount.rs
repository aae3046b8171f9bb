use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    ffi::OsString,
    fs::{self, File},
    hash::{Hash, Hasher},
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::job::{merge_name, reduce_name};
use crate::phase::JobPhase;
use crate::task::DoTaskArgs;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Separa una línea en palabras: solo alfanumérico y '_', en minúscula.
fn tokenize(line: &str) -> impl Iterator<Item = String> + '_ {
    line.split_whitespace().filter_map(|raw| {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect::<String>()
            .to_lowercase();

        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    })
}

fn hash_key_to_partition(key: &str, num_partitions: usize) -> usize {
    let mut h = DefaultHasher::new();
    key.hash(&mut h);
    (h.finish() % num_partitions as u64) as usize
}

/// Escribe "palabra,conteo" ordenado por palabra.
/// Primero a un temporal y después rename, así un reintento nunca deja
/// a la vista un archivo a medio escribir.
fn write_counts(path: &Path, counts: HashMap<String, u64>) -> io::Result<()> {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(format!(
        ".tmp-{}-{}",
        std::process::id(),
        TMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    let tmp = PathBuf::from(tmp);

    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&tmp)?;
    for (word, count) in entries {
        writer.write_record([word.as_str(), count.to_string().as_str()])?;
    }
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp, path)
}

/// Suma en `acc` los conteos de un archivo "palabra,conteo".
fn read_counts(path: &Path, acc: &mut HashMap<String, u64>) -> io::Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    for record in reader.records() {
        let record = record?;
        let word = record.get(0).unwrap_or_default();
        let count: u64 = record
            .get(1)
            .and_then(|c| c.trim().parse().ok())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("conteo inválido en {}: {:?}", path.display(), record),
                )
            })?;

        *acc.entry(word.to_string()).or_insert(0) += count;
    }

    Ok(())
}

/// Tarea map: cuenta las palabras de `input_file` y las reparte en
/// `n_reduce` archivos intermedios según hash(palabra) % n_reduce.
/// Se crean todos los archivos aunque alguna partición quede vacía.
pub fn do_map(
    job_name: &str,
    map_task: usize,
    input_file: &str,
    n_reduce: usize,
    dir: &Path,
) -> io::Result<()> {
    if n_reduce == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "una tarea map necesita al menos un reduce",
        ));
    }

    fs::create_dir_all(dir)?;

    let reader = BufReader::new(File::open(input_file)?);
    let mut partitions: Vec<HashMap<String, u64>> = vec![HashMap::new(); n_reduce];

    for line in reader.lines() {
        let line = line?;
        for word in tokenize(&line) {
            let pid = hash_key_to_partition(&word, n_reduce);
            *partitions[pid].entry(word).or_insert(0) += 1;
        }
    }

    for (reduce_task, counts) in partitions.into_iter().enumerate() {
        let path = dir.join(reduce_name(job_name, map_task, reduce_task));
        write_counts(&path, counts)?;
    }

    Ok(())
}

/// Tarea reduce: junta la partición `reduce_task` de los `n_map` maps
/// y escribe el total por palabra en `merge_name(job, reduce_task)`.
pub fn do_reduce(job_name: &str, reduce_task: usize, n_map: usize, dir: &Path) -> io::Result<()> {
    let mut acc: HashMap<String, u64> = HashMap::new();

    for map_task in 0..n_map {
        let path = dir.join(reduce_name(job_name, map_task, reduce_task));
        read_counts(&path, &mut acc)?;
    }

    fs::create_dir_all(dir)?;
    write_counts(&dir.join(merge_name(job_name, reduce_task)), acc)
}

/// Ejecuta una tarea según su fase, dejando los archivos en `dir`.
pub fn run_task(args: &DoTaskArgs, dir: &Path) -> io::Result<()> {
    match args.phase {
        JobPhase::Map => {
            let input = args.input_file.as_deref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "tarea map sin input_file")
            })?;
            do_map(
                &args.job_name,
                args.task_number,
                input,
                args.num_other_phase,
                dir,
            )
        }
        JobPhase::Reduce => do_reduce(
            &args.job_name,
            args.task_number,
            args.num_other_phase,
            dir,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(sub: &str) -> PathBuf {
        let base = std::env::temp_dir()
            .join("wordcount_task_tests")
            .join(sub);
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(&base).unwrap();
        base
    }

    fn read_lines(path: &Path) -> Vec<String> {
        let content = fs::read_to_string(path).unwrap();
        content.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn tokenize_normaliza_palabras() {
        let words: Vec<String> = tokenize("Hola hola, mundo!! ... mundo_prueba").collect();
        assert_eq!(words, vec!["hola", "hola", "mundo", "mundo_prueba"]);
    }

    #[test]
    fn hash_key_to_partition_retorna_id_en_rango() {
        for key in ["a", "hola", "mundo", ""] {
            assert!(hash_key_to_partition(key, 3) < 3);
        }
    }

    /// Dos maps + tres reduces: la unión de las salidas tiene los conteos globales.
    #[test]
    fn map_y_reduce_cuentan_palabras_de_varios_archivos() {
        let tmp = temp_dir("end_to_end");
        let f0 = tmp.join("in0.txt");
        let f1 = tmp.join("in1.txt");
        writeln!(fs::File::create(&f0).unwrap(), "Hola mundo\nhola").unwrap();
        writeln!(fs::File::create(&f1).unwrap(), "mundo adios").unwrap();

        let out = tmp.join("out");
        do_map("wc", 0, f0.to_str().unwrap(), 3, &out).unwrap();
        do_map("wc", 1, f1.to_str().unwrap(), 3, &out).unwrap();

        for r in 0..3 {
            do_reduce("wc", r, 2, &out).unwrap();
        }

        let mut lines: Vec<String> = (0..3)
            .flat_map(|r| read_lines(&out.join(merge_name("wc", r))))
            .collect();
        lines.sort();

        assert_eq!(lines, vec!["adios,1", "hola,2", "mundo,2"]);
    }

    #[test]
    fn do_map_crea_todas_las_particiones_y_cada_palabra_en_una_sola() {
        let tmp = temp_dir("partitions");
        let input = tmp.join("in.txt");
        writeln!(fs::File::create(&input).unwrap(), "uno dos tres cuatro cinco").unwrap();

        do_map("p", 0, input.to_str().unwrap(), 4, &tmp).unwrap();

        let mut seen = Vec::new();
        for r in 0..4 {
            let path = tmp.join(reduce_name("p", 0, r));
            assert!(path.exists(), "falta la partición {}", r);
            seen.extend(read_lines(&path));
        }
        seen.sort();

        assert_eq!(seen, vec!["cinco,1", "cuatro,1", "dos,1", "tres,1", "uno,1"]);
    }

    #[test]
    fn do_map_no_deja_temporales() {
        let tmp = temp_dir("no_tmp");
        let input = tmp.join("in.txt");
        writeln!(fs::File::create(&input).unwrap(), "a b c").unwrap();
        let out = tmp.join("out");

        do_map("t", 0, input.to_str().unwrap(), 2, &out).unwrap();

        let leftovers: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn do_map_sin_reduces_devuelve_error() {
        let tmp = temp_dir("zero_reduce");
        let input = tmp.join("in.txt");
        fs::File::create(&input).unwrap();

        let res = do_map("z", 0, input.to_str().unwrap(), 0, &tmp);
        assert_eq!(res.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn do_reduce_falla_si_falta_un_intermedio() {
        let tmp = temp_dir("missing");
        let res = do_reduce("m", 0, 1, &tmp);

        assert!(res.is_err());
        assert!(!tmp.join(merge_name("m", 0)).exists());
    }

    #[test]
    fn do_reduce_sin_maps_crea_salida_vacia() {
        let tmp = temp_dir("no_maps");
        do_reduce("e", 0, 0, &tmp).unwrap();

        let content = fs::read_to_string(tmp.join(merge_name("e", 0))).unwrap();
        assert!(content.trim().is_empty());
    }

    #[test]
    fn run_task_map_sin_archivo_devuelve_error() {
        let tmp = temp_dir("no_input");
        let args = DoTaskArgs {
            job_name: "x".to_string(),
            phase: JobPhase::Map,
            task_number: 0,
            input_file: None,
            num_other_phase: 1,
        };

        let res = run_task(&args, &tmp);
        assert_eq!(res.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }
}
