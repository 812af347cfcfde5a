use criterion::{criterion_group, criterion_main, Criterion};
use costflow::{Config, Costflow};

const INPUTS: [&str; 5] = [
    "tomorrow \"RiverBank Properties\" \"Paying the rent\" 2400 Assets:US:BofA:Checking > 2400  Expenses:Home:Rent",
    "@Verizon 59.61 Assets:US:BofA:Checking > Expenses:Home:Phone",
    "Dinner 180 CNY bofa > rx + ry + food",
    "Dinner | bofa USD 180  | rx -60 | ry -60 | food -60",
    "btv 123",
];

fn criterion_benchmark(c: &mut Criterion) {
    let costflow = Costflow::new(Config::default().with_formula("btv", "{{ pre }} bofa > visa"));
    c.bench_function("Interpret", |b| {
        b.iter(|| {
            for input in INPUTS.iter() {
                costflow.interpret(input);
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
