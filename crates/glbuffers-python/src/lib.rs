//! Python bindings for glbuffers

use std::cell::RefCell;
use std::rc::Rc;

use pyo3::exceptions::{PyIndexError, PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict, PySlice, PyString, PyTuple};

use glbuffers_core::{
    Buffer as CoreBuffer, BufferApi, BufferView, Error, Fetched, HeapDevice, ItemView, Key,
    MapGuard, Slice, Value,
};

thread_local! {
    static DEVICE: Rc<HeapDevice> = Rc::new(HeapDevice::new());
}

fn device() -> Rc<dyn BufferApi> {
    DEVICE.with(|d| Rc::clone(d) as Rc<dyn BufferApi>)
}

/// Convert a glbuffers error to the matching Python exception
fn to_py_err(e: Error) -> PyErr {
    match e {
        Error::IndexOutOfBound { .. }
        | Error::SliceOutOfBound { .. }
        | Error::ZeroStep
        | Error::InvalidIndex => PyIndexError::new_err(e.to_string()),
        Error::KeyKind(_) => PyKeyError::new_err(e.to_string()),
        Error::Freed => PyRuntimeError::new_err(e.to_string()),
        _ => PyValueError::new_err(e.to_string()),
    }
}

fn parse_key(key: &PyAny) -> PyResult<Key> {
    if let Ok(index) = key.extract::<i64>() {
        return Ok(Key::Index(index));
    }
    if let Ok(slice) = key.downcast::<PySlice>() {
        return Ok(Key::Slice(Slice {
            start: slice.getattr("start")?.extract()?,
            stop: slice.getattr("stop")?.extract()?,
            step: slice.getattr("step")?.extract()?,
        }));
    }
    Err(to_py_err(Error::KeyKind(
        key.get_type().name()?.to_string(),
    )))
}

/// Convert an arbitrary Python object into a packable [`Value`]
///
/// Numbers become scalars; any other iterable becomes a sequence. Strings
/// and bytes are rejected up front, iterating them would recurse forever.
fn extract_value(obj: &PyAny) -> PyResult<Value> {
    if let Ok(n) = obj.extract::<f64>() {
        return Ok(Value::Num(n));
    }
    if obj.is_instance_of::<PyString>() || obj.is_instance_of::<PyBytes>() {
        return Err(PyValueError::new_err(format!(
            "cannot pack a {}",
            obj.get_type().name()?
        )));
    }
    let mut items = Vec::new();
    for item in obj.iter()? {
        items.push(extract_value(item?)?);
    }
    Ok(Value::Seq(items))
}

fn item_to_py(py: Python<'_>, item: &ItemView) -> PyResult<PyObject> {
    let dict = PyDict::new(py);
    for (name, values) in item.fields() {
        dict.set_item(name, PyTuple::new(py, values))?;
    }
    Ok(dict.into_py(py))
}

/// A device buffer of packed records described by a format string
///
/// Supports `len()`, integer and slice subscripts, and `with buf:` for
/// scoped mapped access.
#[pyclass(unsendable)]
struct Buffer {
    inner: CoreBuffer,
    view: BufferView,
    guard: RefCell<Option<MapGuard>>,
}

impl Buffer {
    fn wrap(inner: CoreBuffer) -> Self {
        let view = inner.data();
        Self {
            inner,
            view,
            guard: RefCell::new(None),
        }
    }
}

#[pymethods]
impl Buffer {
    #[staticmethod]
    fn array(format: &str) -> PyResult<Self> {
        CoreBuffer::array(device(), format)
            .map(Self::wrap)
            .map_err(to_py_err)
    }

    #[staticmethod]
    fn element(format: &str) -> PyResult<Self> {
        CoreBuffer::element(device(), format)
            .map(Self::wrap)
            .map_err(to_py_err)
    }

    #[staticmethod]
    fn pixel_pack(format: &str) -> PyResult<Self> {
        CoreBuffer::pixel_pack(device(), format)
            .map(Self::wrap)
            .map_err(to_py_err)
    }

    #[staticmethod]
    fn pixel_unpack(format: &str) -> PyResult<Self> {
        CoreBuffer::pixel_unpack(device(), format)
            .map(Self::wrap)
            .map_err(to_py_err)
    }

    #[getter]
    fn format(&self) -> &str {
        self.inner.format()
    }

    #[getter]
    fn handle(&self) -> u32 {
        self.inner.handle()
    }

    #[getter]
    fn size(&self) -> usize {
        self.inner.size()
    }

    #[getter]
    fn valid(&self) -> bool {
        self.inner.valid()
    }

    #[getter]
    fn mapped(&self) -> bool {
        self.inner.mapped()
    }

    /// Resize to exactly `count` zero-padded records
    fn reserve(&self, count: usize) -> PyResult<()> {
        self.inner.reserve(count).map_err(to_py_err)
    }

    /// Replace the full contents with a sequence of records
    fn set_data(&self, rows: &PyAny) -> PyResult<()> {
        match extract_value(rows)? {
            Value::Seq(rows) => self.inner.set_data(&rows).map_err(to_py_err),
            Value::Num(_) => Err(PyValueError::new_err("expected a sequence of records")),
        }
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __getitem__(&self, py: Python<'_>, key: &PyAny) -> PyResult<PyObject> {
        match self.view.get_key(&parse_key(key)?).map_err(to_py_err)? {
            Fetched::One(item) => item_to_py(py, &item),
            Fetched::Many(items) => {
                let out: Vec<PyObject> = items
                    .iter()
                    .map(|item| item_to_py(py, &item))
                    .collect::<PyResult<_>>()?;
                Ok(out.into_py(py))
            }
        }
    }

    fn __setitem__(&self, key: &PyAny, value: &PyAny) -> PyResult<()> {
        let value = extract_value(value)?;
        self.view
            .set_key(&parse_key(key)?, &value)
            .map_err(to_py_err)
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyResult<PyRef<'_, Self>> {
        let guard = slf.inner.map().map_err(to_py_err)?;
        *slf.guard.borrow_mut() = Some(guard);
        Ok(slf)
    }

    fn __exit__(
        &self,
        _exc_type: Option<&PyAny>,
        _exc_value: Option<&PyAny>,
        _traceback: Option<&PyAny>,
    ) -> bool {
        self.guard.borrow_mut().take();
        false
    }
}

#[pymodule]
fn glbuffers(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<Buffer>()?;
    Ok(())
}
