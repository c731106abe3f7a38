//! Buffer behaviour over the in-process device

use std::rc::Rc;

use glbuffers_core::{
    AccessHint, Buffer, BufferApi, BufferKind, HeapDevice, Slice, UsageHint, Value,
};

fn device() -> Rc<dyn BufferApi> {
    Rc::new(HeapDevice::new())
}

fn rows(n: usize) -> Vec<Value> {
    (0..n).map(|y| Value::from([y as f64; 4])).collect()
}

fn foo_of(view: &glbuffers_core::BufferView, slice: Slice) -> Vec<Vec<f64>> {
    view.get_slice(&slice)
        .unwrap()
        .iter()
        .map(|item| item["foo"].to_vec())
        .collect()
}

#[test]
fn test_create() {
    let dev = device();

    let buffers = [
        Buffer::array(dev.clone(), "(4f)[foo]").unwrap(),
        Buffer::element(dev.clone(), "(4f)[foo]").unwrap(),
        Buffer::pixel_pack(dev.clone(), "(4f)[foo]").unwrap(),
        Buffer::pixel_unpack(dev.clone(), "(4f)[foo]").unwrap(),
        Buffer::with_options(
            dev.clone(),
            BufferKind::Array,
            "(4f)[foo]",
            UsageHint::DynamicCopy,
            AccessHint::default(),
        )
        .unwrap(),
    ];

    for buf in &buffers {
        // usage reflects the last upload; nothing was uploaded yet
        assert_eq!(UsageHint::StaticDraw, buf.usage());
        assert_eq!(AccessHint::ReadWrite, buf.access());
        assert_ne!(0, buf.handle());
        assert_eq!(0, buf.len());
        assert!(buf.is_empty());
    }
}

#[test]
fn test_valid() {
    let dev = device();

    let buf1 = Buffer::array(dev.clone(), "(4f)[foo]").unwrap();
    let buf2 = Buffer::from_raw(dev.clone(), 8883, "(4f)[foo]", false).unwrap();

    assert!(buf1.valid());
    assert!(!buf2.valid());
}

#[test]
fn test_reserve() {
    let dev = device();
    let buf = Buffer::with_options(
        dev,
        BufferKind::Array,
        "(4f)[foo]",
        UsageHint::DynamicDraw,
        AccessHint::default(),
    )
    .unwrap();

    buf.reserve(200).unwrap();

    assert_eq!(UsageHint::DynamicDraw, buf.usage());
    assert_eq!(200, buf.len());
    assert_eq!(3200, buf.size());

    // reserved records are zeroed
    assert_eq!([0.0; 4], buf.data().get(199).unwrap()["foo"]);

    // shrinking truncates, growing pads with zero records
    buf.data().set(0, &Value::from([9.0; 4])).unwrap();
    buf.reserve(3).unwrap();
    assert_eq!(3, buf.len());
    assert_eq!([9.0; 4], buf.data().get(0).unwrap()["foo"]);
    buf.reserve(5).unwrap();
    assert_eq!([9.0; 4], buf.data().get(0).unwrap()["foo"]);
    assert_eq!([0.0; 4], buf.data().get(4).unwrap()["foo"]);
}

#[test]
fn test_get_set() {
    let dev = device();
    let buf = Buffer::with_options(
        dev,
        BufferKind::Array,
        "(4f)[foo]",
        UsageHint::DynamicDraw,
        AccessHint::default(),
    )
    .unwrap();

    assert_eq!(UsageHint::StaticDraw, buf.usage());
    assert_eq!(0, buf.len());
    assert_eq!(0, buf.size());

    buf.set_data(&rows(10)).unwrap();

    assert_eq!(UsageHint::DynamicDraw, buf.usage());
    assert_eq!(10, buf.len());
    assert_eq!(160, buf.size());

    let view = buf.data();

    assert_eq!([0.0; 4], view.get(0).unwrap()["foo"]);
    assert_eq!(
        vec![vec![1.0; 4], vec![2.0; 4]],
        foo_of(&view, Slice::new(1, 3, None))
    );
    assert_eq!(
        vec![vec![1.0; 4], vec![3.0; 4]],
        foo_of(&view, Slice::new(1, 4, 2))
    );

    view.set(0, &Value::from([10.0; 4])).unwrap();
    view.set(1, &Value::Seq(vec![Value::from([11.0; 4])])).unwrap();
    view.set_slice(
        &Slice::new(2, 5, None),
        &[
            Value::from([12.0; 4]),
            Value::from([13.0; 4]),
            Value::from([14.0; 4]),
        ],
    )
    .unwrap();
    view.set_slice(
        &Slice::new(8, 5, -1),
        &[
            Value::from([15.0; 4]),
            Value::from([16.0; 4]),
            Value::from([17.0; 4]),
        ],
    )
    .unwrap();

    assert_eq!([10.0; 4], view.get(0).unwrap()["foo"]);
    assert_eq!([11.0; 4], view.get(1).unwrap()["foo"]);
    assert_eq!(
        vec![vec![12.0; 4], vec![13.0; 4], vec![14.0; 4]],
        foo_of(&view, Slice::new(2, 5, None))
    );
    assert_eq!(
        vec![vec![15.0; 4], vec![16.0; 4], vec![17.0; 4]],
        foo_of(&view, Slice::new(8, 5, -1))
    );
}

#[test]
fn test_get_set_mapped() {
    let dev = device();
    let buf = Buffer::array(dev, "(4f)[foo]").unwrap();
    buf.set_data(&rows(10)).unwrap();

    let view = buf.data();

    assert!(!buf.mapped());
    {
        let _guard = buf.map().unwrap();
        assert!(buf.mapped());

        assert_eq!([0.0; 4], view.get(0).unwrap()["foo"]);
        assert_eq!(
            vec![vec![1.0; 4], vec![2.0; 4]],
            foo_of(&view, Slice::new(1, 3, None))
        );
        assert_eq!(
            vec![vec![1.0; 4], vec![3.0; 4]],
            foo_of(&view, Slice::new(1, 4, 2))
        );

        view.set(0, &Value::from([10.0; 4])).unwrap();
        view.set_slice(
            &Slice::new(2, 5, None),
            &[
                Value::from([12.0; 4]),
                Value::from([13.0; 4]),
                Value::from([14.0; 4]),
            ],
        )
        .unwrap();
        view.set_slice(
            &Slice::new(8, 5, -1),
            &[
                Value::from([15.0; 4]),
                Value::from([16.0; 4]),
                Value::from([17.0; 4]),
            ],
        )
        .unwrap();

        // strided writes are legal against a live mapping
        view.set_slice(
            &Slice::new(1, 4, 2),
            &[Value::from([21.0; 4]), Value::from([23.0; 4])],
        )
        .unwrap();
    }
    assert!(!buf.mapped());

    // mapped writes persist after unmap
    let view = buf.data();
    assert_eq!([10.0; 4], view.get(0).unwrap()["foo"]);
    assert_eq!([21.0; 4], view.get(1).unwrap()["foo"]);
    assert_eq!([23.0; 4], view.get(3).unwrap()["foo"]);
    // record 3 holds the strided write, not the earlier 13.0
    assert_eq!(
        vec![vec![12.0; 4], vec![23.0; 4], vec![14.0; 4]],
        foo_of(&view, Slice::new(2, 5, None))
    );
    assert_eq!(
        vec![vec![15.0; 4], vec![16.0; 4], vec![17.0; 4]],
        foo_of(&view, Slice::new(8, 5, -1))
    );
}

#[test]
fn test_get_set_fail() {
    let dev = device();
    let buf1 = Buffer::array(dev.clone(), "(4f)[foo]").unwrap();
    buf1.set_data(&rows(3)).unwrap();

    let buf2 = Buffer::array(dev, "(4f)[foo]").unwrap();

    let err = buf1
        .data()
        .set_slice(
            &Slice::new(0, 2, None),
            &[
                Value::from([12.0; 4]),
                Value::from([13.0; 4]),
                Value::from([14.0; 4]),
            ],
        )
        .unwrap_err();
    assert_eq!("Buffer do not support resizing", err.to_string());

    let err = buf1
        .data()
        .set_slice(&Slice::new(0, 2, 2), &[Value::from([1.0; 4])])
        .unwrap_err();
    assert_eq!(
        "Unmapped buffer write do not support steps different than 1.",
        err.to_string()
    );

    // the strided error wins over a count mismatch while unmapped
    let err = buf1
        .data()
        .set_slice(&Slice::new(0, 2, 2), &rows(4))
        .unwrap_err();
    assert_eq!(
        "Unmapped buffer write do not support steps different than 1.",
        err.to_string()
    );

    let err = buf2
        .data()
        .set_slice(
            &Slice::new(0, 3, None),
            &[Value::Num(1.0), Value::Num(2.0)],
        )
        .unwrap_err();
    assert_eq!(
        "Slices indexes \"0:3\" out of bound, buffer has a length of \"0\"",
        err.to_string()
    );
}

#[test]
fn test_resize_mismatch_mapped() {
    let dev = device();
    let buf = Buffer::array(dev, "(4f)[foo]").unwrap();
    buf.set_data(&rows(3)).unwrap();

    let _guard = buf.map().unwrap();
    let err = buf
        .data()
        .set_slice(&Slice::new(0, 2, None), &[Value::from([12.0; 4])])
        .unwrap_err();
    assert_eq!("Buffer do not support resizing", err.to_string());
}

#[test]
fn test_mapped_mode_errors() {
    let dev = device();
    let buf = Buffer::array(dev, "(4f)[foo]").unwrap();
    buf.set_data(&rows(2)).unwrap();

    let _guard = buf.map().unwrap();

    let err = buf.map().err().unwrap();
    assert_eq!("Buffer is already mapped", err.to_string());

    let err = buf.reserve(5).unwrap_err();
    assert_eq!("Cannot resize a mapped buffer", err.to_string());

    let err = buf.set_data(&rows(2)).unwrap_err();
    assert_eq!("Cannot resize a mapped buffer", err.to_string());
}

#[test]
fn test_freeing() {
    let dev = device();

    let buf1 = Buffer::array(dev.clone(), "(4f)[foo]").unwrap();
    buf1.set_data(&rows(2)).unwrap();
    let bid1 = buf1.handle();
    let data = buf1.data();

    let raw = dev.allocate(BufferKind::Array).unwrap();
    let buf2 = Buffer::from_raw(dev.clone(), raw, "(4f)[foo]", false).unwrap();
    let bid2 = buf2.handle();

    drop(buf1);
    drop(buf2);

    assert!(!dev.is_valid(bid1));
    assert!(dev.is_valid(bid2));

    let err = data.set_data(&rows(1)).unwrap_err();
    assert_eq!("Buffer was freed", err.to_string());

    let err = data.get(0).unwrap_err();
    assert_eq!("Buffer was freed", err.to_string());

    let err = data.set(0, &Value::from([20.0; 4])).unwrap_err();
    assert_eq!("Buffer was freed", err.to_string());

    dev.delete(bid2);
}

#[test]
fn test_key_dispatch() {
    use glbuffers_core::{Fetched, Key};

    let dev = device();
    let buf = Buffer::array(dev, "(4f)[foo]").unwrap();
    buf.set_data(&rows(4)).unwrap();
    let view = buf.data();

    match view.get_key(&Key::Index(-1)).unwrap() {
        Fetched::One(item) => assert_eq!([3.0; 4], item["foo"]),
        Fetched::Many(_) => panic!("expected a single item"),
    }

    match view.get_key(&Key::Slice(Slice::full())).unwrap() {
        Fetched::Many(items) => assert_eq!(4, items.len()),
        Fetched::One(_) => panic!("expected a slice"),
    }

    view.set_key(&Key::Index(0), &Value::from([5.0; 4])).unwrap();
    assert_eq!([5.0; 4], view.get(0).unwrap()["foo"]);
}
