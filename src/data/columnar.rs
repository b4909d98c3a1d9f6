//! Parquet source reader. Each mapped column is cast to its target Arrow type so
//! dictionary-encoded strings and narrower numeric types load the same way.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::data::loader::{
    check_required, columns_from_mapping, text_cell, LoadError, ParsedSource, RowValues,
};
use crate::data::record::{Column, DataYear};

const BATCH_SIZE: usize = 8192;

enum TypedColumn {
    Text(Column, StringArray),
    Float(Column, Float64Array),
    Int(Int64Array),
    Bool(BooleanArray),
}

impl TypedColumn {
    fn from_array(column: Column, array: &ArrayRef) -> Result<Option<Self>, ArrowError> {
        let typed = match column {
            Column::EmployerName | Column::City | Column::State | Column::Classifications => {
                Self::Text(column, downcast::<StringArray>(&cast(array, &DataType::Utf8)?)?)
            }
            Column::CapExemptScore | Column::ApprovalRate => {
                Self::Float(column, downcast::<Float64Array>(&cast(array, &DataType::Float64)?)?)
            }
            Column::TotalPetitions => {
                Self::Int(downcast::<Int64Array>(&cast(array, &DataType::Int64)?)?)
            }
            Column::LikelyCapExempt => {
                Self::Bool(downcast::<BooleanArray>(&cast(array, &DataType::Boolean)?)?)
            }
            Column::DataYear => return Ok(None),
        };
        Ok(Some(typed))
    }

    fn apply(&self, index: usize, row: &mut RowValues) {
        match self {
            Self::Text(column, array) => {
                let value = (!array.is_null(index))
                    .then(|| text_cell(array.value(index)))
                    .flatten();
                match column {
                    Column::EmployerName => row.employer_name = value,
                    Column::City => row.city = value,
                    Column::State => row.state = value,
                    _ => row.classifications = value,
                }
            }
            Self::Float(column, array) => {
                let value = (!array.is_null(index))
                    .then(|| array.value(index))
                    .filter(|v| !v.is_nan());
                if *column == Column::CapExemptScore {
                    row.cap_exempt_score = value;
                } else {
                    row.approval_rate = value;
                }
            }
            Self::Int(array) => {
                row.total_petitions = (!array.is_null(index)).then(|| array.value(index));
            }
            Self::Bool(array) => {
                row.likely_cap_exempt = (!array.is_null(index)).then(|| array.value(index));
            }
        }
    }
}

fn downcast<T: Array + Clone + 'static>(array: &ArrayRef) -> Result<T, ArrowError> {
    array
        .as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| {
            ArrowError::CastError(format!("unexpected array type {}", array.data_type()))
        })
}

pub fn read_parquet(
    path: &Path,
    year: DataYear,
    limit: Option<usize>,
) -> Result<ParsedSource, LoadError> {
    let path_str = path.display().to_string();
    let parquet_error = |source| LoadError::Parquet {
        path: path_str.clone(),
        source,
    };
    let arrow_error = |source| LoadError::Arrow {
        path: path_str.clone(),
        source,
    };

    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path_str.clone(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(parquet_error)?;
    let mapping: Vec<Option<Column>> = builder
        .schema()
        .fields()
        .iter()
        .map(|field| Column::from_header(field.name()))
        .collect();
    let columns = columns_from_mapping(&mapping);
    check_required(path, &columns)?;

    let mut builder = builder.with_batch_size(BATCH_SIZE);
    if let Some(limit) = limit {
        builder = builder.with_limit(limit);
    }
    let reader = builder.build().map_err(parquet_error)?;

    let mut parsed = ParsedSource::new(columns);
    for batch in reader {
        let batch = batch.map_err(arrow_error)?;
        let mut typed = Vec::new();
        for (index, column) in mapping.iter().enumerate() {
            let Some(column) = *column else {
                continue;
            };
            let typed_column =
                TypedColumn::from_array(column, batch.column(index)).map_err(arrow_error)?;
            if let Some(col) = typed_column {
                typed.push(col);
            }
        }
        for index in 0..batch.num_rows() {
            let mut row = RowValues::default();
            for column in &typed {
                column.apply(index, &mut row);
            }
            parsed.push(row, year);
        }
    }
    Ok(parsed)
}
