use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gcmemcard::card::{Card, CardFileFormat};
use gcmemcard::collaborators::{FixedSram, FixedTime};
use gcmemcard::format::FormatOptions;
use gcmemcard::layout::CardSize;

fn formatted_card() -> Card {
    let options = FormatOptions { size: CardSize::Mb64, shift_jis: false };
    let time = FixedTime(0x1122_3344_5566_7788);
    let sram = FixedSram { flash_id: [9; 12], counter_bias: 0, language: 0 };
    Card::format(&options, &time, &sram)
}

fn bench_load(c: &mut Criterion) {
    let bytes = formatted_card().save();
    c.bench_function("load a 64Mb card", |b| {
        b.iter(|| Card::load(black_box(&bytes), CardFileFormat::Raw).unwrap());
    });
}

fn bench_save(c: &mut Criterion) {
    let card = formatted_card();
    c.bench_function("save a 64Mb card", |b| {
        b.iter(|| black_box(card.save()));
    });
}

criterion_group!(benches, bench_load, bench_save);
criterion_main!(benches);
