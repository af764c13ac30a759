use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use talos::{
    ClassDef, Context, MessageArgs, OBJECT, ObjectPtr, Selector,
    SelectorHandle, construct, send,
};

#[repr(C)]
struct AccumulatorFields {
    total: u64,
}

unsafe extern "C" fn acc_con(
    this: ObjectPtr,
    _cmd: SelectorHandle,
    _args: *const *mut u8,
    ret: *mut u8,
) {
    unsafe { std::ptr::write_unaligned(ret.cast::<*mut u8>(), this.as_raw()) };
}

unsafe extern "C" fn acc_add(
    this: ObjectPtr,
    _cmd: SelectorHandle,
    args: *const *mut u8,
    ret: *mut u8,
) {
    let argv = unsafe { std::slice::from_raw_parts(args.cast::<usize>(), 1) };
    let fields = unsafe { &mut *this.payload::<AccumulatorFields>() };
    fields.total = fields.total.wrapping_add(argv[0] as u64);
    unsafe {
        std::ptr::write_unaligned(ret.cast::<usize>(), fields.total as usize)
    };
}

static ACCUMULATOR: ClassDef = ClassDef::new(
    "BenchAccumulator",
    "",
    std::mem::size_of::<AccumulatorFields>(),
    Some(&OBJECT),
    |b| {
        b.slot("con", acc_con, 0);
        b.slot("add", acc_add, 1);
    },
);

fn bench_dispatch(c: &mut Criterion) {
    let class = ACCUMULATOR.initialize();
    let ctx = Context::new();
    let con = Selector::intern("con");
    let add = Selector::intern("add");

    let obj = construct(&class, &class, &con, &ctx, &MessageArgs::None).unwrap();

    c.bench_function("send/add", |b| {
        b.iter(|| unsafe {
            send(black_box(&obj), &add, &MessageArgs::one(1))
        });
    });

    c.bench_function("construct+free", |b| {
        b.iter(|| {
            let local = Context::new();
            let obj =
                construct(&class, &class, &con, &local, &MessageArgs::None)
                    .unwrap();
            black_box(&obj);
            local.free();
        });
    });

    ctx.free();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
