mod arena;
mod dense;
mod fe;
mod problem;
mod weak_form;
