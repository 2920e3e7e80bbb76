/*!

This is the long-form manual for `cdf_merge` and `csv2cdf`.

`csv2cdf` reads the CSV exports of a longitudinal cohort (one file per
assessment or questionnaire) and writes, for every participant, one JSON
document in the cohort data format (CDF). Each variable of the document maps
assessment labels to the value measured at that assessment.

## Running

```bash
csv2cdf ids.csv config.json output/
```

- `ids.csv` the list of participants to export
- `config.json` the transformation configuration
- `output/` the folder receiving one `<participant id>.cdf.json` file per
  participant. It is created if needed.

Options:
- `--id-column <name>` (default `project_pseudo_id`) the identifier column of
  the source files. The header is matched without regard to case.
- `--data-dir <dir>` resolve the relative file paths of the configuration
  against this folder instead of the working directory.
- `--reference <dir>` compare every record with the file of the same name in
  this folder. Differences are printed and make the run fail.
- `--progress-every <n>` (default 100) how often progress is logged.
- `--verbose` turn on debug logging. `RUST_LOG` is also honoured.

## Input formats

### Identifier list

A CSV file with a single column. The first row is a header (normally
`project_pseudo_id`), every following row is one participant.

```text
project_pseudo_id
participantA
participantB
```

Identifiers are used verbatim: no trimming and no case change.

### Configuration

A JSON object. Each key is the name of an output variable, each value the
list of assessments where that variable was measured. An assessment is an
object with a single entry: the label of the assessment and the path of the
CSV file holding it.

```json
{
  "var1": [{"1a": "data/file_a.csv"}, {"1b": "data/file_b.csv"}],
  "varN": [{"general": "data/file_b.csv"}]
}
```

Labels must be unique within a variable. A variable must have at least one
assessment.

### Source files

Comma separated, with a header row. The header must contain the identifier
column and one column named after every variable that the configuration maps
to this file. Other columns are ignored. Values are read as text, exactly as
written.

A participant may appear on several rows of the same file when they filled
in several variants of a questionnaire. See below.

## Resolution rules

For every variable and every assessment of that variable:

- no row for the participant: the value is empty;
- one row: the value of the cell. Values starting with `$` are
  missing-value codes (for example `$6`, "don't know") and are reported as
  empty;
- several rows:
  - for `project_pseudo_id`, `variant_id`, `date`, `age`, `gender` and
    `zip_code`, the value of the first row (in file order);
  - for any other variable, only one of the rows is expected to have a
    value. Empty cells and missing-value codes do not count. With no value
    the result is empty. With two or more values the run stops with an
    error naming the variable, the file and the participant.

## Output

```json
{
  "project_pseudo_id": {"1a": "participantA"},
  "var1": {"1a": "1", "1b": "20"},
  "varN": {"general": "2001-1"}
}
```

The `project_pseudo_id` entry repeats the identifier under the first label
of the configuration.

## Errors

The run stops with a non-zero exit code when:
- the configuration is malformed;
- a source file cannot be read, or lacks the identifier column or a
  configured column;
- two variants of a questionnaire disagree on a variable.

Records written before the error are left in place.

 */
