use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, TimestampNanosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use datafusion::scalar::ScalarValue;

use crate::common::key::GroupKey;
use crate::common::table_chunk::TableChunk;

pub fn host_key(host: &str) -> GroupKey {
    GroupKey::new(vec![("host".to_string(), ScalarValue::Utf8(Some(host.to_string())))])
}

pub fn create_test_batch(ts: &[Option<i64>], values: ArrayRef) -> RecordBatch {
    let schema = Schema::new(vec![
        Field::new("_time", DataType::Timestamp(TimeUnit::Nanosecond, None), true),
        Field::new("_value", values.data_type().clone(), true),
    ]);
    let times = TimestampNanosecondArray::from(ts.to_vec());
    RecordBatch::try_new(Arc::new(schema), vec![Arc::new(times), values]).unwrap()
}

pub fn create_test_chunk(host: &str, ts: &[Option<i64>], values: &[Option<f64>]) -> TableChunk {
    let values: ArrayRef = Arc::new(Float64Array::from(values.to_vec()));
    TableChunk::new(host_key(host), create_test_batch(ts, values))
}

pub fn create_int_chunk(host: &str, ts: &[Option<i64>], values: &[Option<i64>]) -> TableChunk {
    let values: ArrayRef = Arc::new(Int64Array::from(values.to_vec()));
    TableChunk::new(host_key(host), create_test_batch(ts, values))
}

pub fn create_uint_chunk(host: &str, ts: &[Option<i64>], values: &[Option<u64>]) -> TableChunk {
    let values: ArrayRef = Arc::new(UInt64Array::from(values.to_vec()));
    TableChunk::new(host_key(host), create_test_batch(ts, values))
}

pub fn times(ts: &[i64]) -> Vec<Option<i64>> {
    ts.iter().copied().map(Some).collect()
}

pub fn column_i64(batch: &RecordBatch, name: &str) -> Vec<Option<i64>> {
    let col = batch.column_by_name(name).unwrap();
    match col.data_type() {
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            let arr = col.as_any().downcast_ref::<TimestampNanosecondArray>().unwrap();
            (0..arr.len()).map(|i| if arr.is_null(i) { None } else { Some(arr.value(i)) }).collect()
        }
        _ => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            (0..arr.len()).map(|i| if arr.is_null(i) { None } else { Some(arr.value(i)) }).collect()
        }
    }
}

pub fn column_u64(batch: &RecordBatch, name: &str) -> Vec<Option<u64>> {
    let arr = batch.column_by_name(name).unwrap().as_any().downcast_ref::<UInt64Array>().unwrap();
    (0..arr.len()).map(|i| if arr.is_null(i) { None } else { Some(arr.value(i)) }).collect()
}

pub fn column_f64(batch: &RecordBatch, name: &str) -> Vec<Option<f64>> {
    let arr = batch.column_by_name(name).unwrap().as_any().downcast_ref::<Float64Array>().unwrap();
    (0..arr.len()).map(|i| if arr.is_null(i) { None } else { Some(arr.value(i)) }).collect()
}
