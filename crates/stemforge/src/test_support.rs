//! Scripted stand-in for the separation engine
//!
//! `sh -c SCRIPT fake-engine <args…>` understands the same arguments as the
//! real tool and copies its input into every stem it claims to produce, so
//! the stems are real audio.

use std::path::Path;

use crate::separation::EngineConfig;

const FAKE_ENGINE: &str = r#"
two=""
skip=""
while [ $# -gt 0 ]; do
  case "$1" in
    -n) model="$2"; shift 2 ;;
    -d) shift 2 ;;
    -o) out="$2"; shift 2 ;;
    --two-stems) two="$2"; shift 2 ;;
    --skip=*) skip="${1#--skip=}"; shift ;;
    *) input="$1"; shift ;;
  esac
done
name=$(basename "$input")
name="${name%.*}"
dir="$out/$model/$name"
mkdir -p "$dir"
echo "Separating $name with $model"
printf '  0%%|          |\r 50%%|#####     |\r100%%|##########|\n'
if [ -n "$two" ]; then
  cp "$input" "$dir/$two.wav"
  cp "$input" "$dir/no_$two.wav"
else
  for stem in vocals drums bass other; do
    [ "$stem" = "$skip" ] || cp "$input" "$dir/$stem.wav"
  done
fi
echo "separated $name"
"#;

fn script(body: &str) -> EngineConfig {
    EngineConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), body.to_string(), "fake-engine".to_string()],
    }
}

/// Engine that writes the stems the real tool would
pub fn fake_engine() -> EngineConfig {
    script(FAKE_ENGINE)
}

/// Engine that prints `started` and then blocks until killed
pub fn hanging_engine() -> EngineConfig {
    script("echo started; exec sleep 30")
}

/// Whether `dir` holds exactly `files` and nothing else
pub fn dir_has_exactly(dir: &Path, files: &[&str]) -> bool {
    let mut found: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => return false,
    };
    found.sort();
    let mut expected: Vec<String> = files.iter().map(|f| f.to_string()).collect();
    expected.sort();
    found == expected
}
