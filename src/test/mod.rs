mod app;
mod end_to_end;
mod packet;
mod sim_time;
